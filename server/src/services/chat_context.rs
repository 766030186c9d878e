// server/src/services/chat_context.rs

//! Text sent to the assistant: the system prompt and the data block built
//! from a reporting snapshot plus whatever the message asked about.

use crate::models::{
  AccountCounts, Order, OrderStats, OrderWithLines, PopularService, Service, StatusCount, TopCustomer, WindowStats,
};
use rust_decimal::Decimal;
use std::fmt::Write;

pub const SYSTEM_PROMPT: &str = "You are the AI assistant of **Mory Laundry**.

ABOUT MORY LAUNDRY:
- An online laundry management system
- Goal: make ordering and managing laundry easy
- Features: online ordering, status tracking, customer management, revenue reports
- Customers can sign up, log in, place laundry orders and follow their status
- Admins manage orders, services and users, and read the reports

HOW TO ANSWER:
- Answer SHORT and to the point (2-4 sentences)
- Use **bold** for important numbers
- Use emoji sparingly
- Money format: Rp xxx.xxx
- When asked about the website or app, explain the Mory Laundry features
- When asked about data, give the data directly

ORDER STATUSES:
- queued: new order received
- washing: being washed
- drying: being dried
- ironing: being ironed
- ready_for_pickup: done, waiting for pickup
- completed: picked up by the customer
- cancelled: order cancelled";

pub const FALLBACK_REPLY: &str = "Sorry, I can't process your request right now.";

pub const RECENT_ORDER_LIMIT: i64 = 10;
pub const TOP_LIMIT: i64 = 10;
pub const CUSTOMER_SEARCH_LIMIT: i64 = 20;

const FILLER_WORDS: &[&str] = &["customer", "customers", "order", "orders", "from", "of", "find", "show"];

/// Reporting data gathered for every chat request.
#[derive(Debug, Clone, Default)]
pub struct ChatSnapshot {
  pub stats: OrderStats,
  pub today: WindowStats,
  pub this_week: WindowStats,
  pub this_month: WindowStats,
  pub by_status: Vec<StatusCount>,
  pub recent_orders: Vec<Order>,
  pub services: Vec<Service>,
  pub active_services: i64,
  pub popular_services: Vec<PopularService>,
  pub accounts: AccountCounts,
  pub top_customers: Vec<TopCustomer>,
}

#[derive(Debug, Clone)]
pub enum OrderLookup {
  Found(OrderWithLines),
  /// The order number that was asked about but does not exist.
  Missing(String),
}

#[derive(Debug, Clone)]
pub struct CustomerSearch {
  pub term: String,
  pub orders: Vec<Order>,
}

pub fn mentions_customer(message: &str) -> bool {
  message.to_lowercase().contains("customer")
}

pub fn mentions_service(message: &str) -> bool {
  let lower = message.to_lowercase();
  lower.contains("service") || lower.contains("price")
}

/// The message with filler words removed, if enough is left to search for.
pub fn customer_search_term(message: &str) -> Option<String> {
  let term = message
    .split_whitespace()
    .filter(|word| {
      let bare = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
      !FILLER_WORDS.contains(&bare.as_str())
    })
    .collect::<Vec<_>>()
    .join(" ");
  let term = term.trim_matches(|c: char| c.is_whitespace() || c == '?' || c == '!' || c == '.');
  (term.chars().count() > 2).then(|| term.to_string())
}

/// First catalog entry whose name appears in the message.
pub fn match_service<'a>(services: &'a [Service], message: &str) -> Option<&'a Service> {
  let lower = message.to_lowercase();
  services
    .iter()
    .find(|service| lower.contains(&service.service_name.to_lowercase()))
}

/// Rupiah with `.` thousands separators and `,` decimals: `Rp 39.000`, `Rp 1.500,5`.
pub fn format_rupiah(amount: Decimal) -> String {
  let rounded = amount.round_dp(2);
  let digits = rounded.trunc().abs().to_string();
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push('.');
    }
    grouped.push(c);
  }

  let fraction = rounded.abs().fract().normalize();
  let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
  if fraction.is_zero() {
    format!("Rp {}{}", sign, grouped)
  } else {
    let fraction = fraction.to_string();
    let decimals = fraction.trim_start_matches("0.");
    format!("Rp {}{},{}", sign, grouped, decimals)
  }
}

fn order_row(order: &Order) -> String {
  format!(
    "- {} | {} | {} | {} | {} | {}",
    order.order_number,
    order.customer_name,
    order.phone_number,
    order.status,
    format_rupiah(order.total_price),
    order.created_at.format("%d/%m/%Y")
  )
}

/// Assembles the data block placed before the user's question.
pub fn build_context(
  snapshot: &ChatSnapshot,
  order_lookup: Option<&OrderLookup>,
  customer_search: Option<&CustomerSearch>,
  service_detail: Option<&Service>,
) -> String {
  let mut out = String::new();
  let s = &snapshot.stats;

  // Writing into a String cannot fail.
  let _ = writeln!(out, "========== MORY LAUNDRY DATA ==========\n");
  let _ = writeln!(out, "ORDER STATISTICS:");
  let _ = writeln!(out, "- Total orders: {}", s.total_orders);
  let _ = writeln!(out, "- Completed orders: {}", s.completed_orders);
  let _ = writeln!(out, "- Active orders (in progress): {}", s.active_orders);
  let _ = writeln!(out, "- Cancelled orders: {}", s.cancelled_orders);
  let _ = writeln!(out, "- Total revenue: {}\n", format_rupiah(s.total_revenue));

  for (label, window) in [
    ("TODAY", &snapshot.today),
    ("THIS WEEK", &snapshot.this_week),
    ("THIS MONTH", &snapshot.this_month),
  ] {
    let _ = writeln!(out, "{}:", label);
    let _ = writeln!(out, "- Orders in: {}", window.orders);
    let _ = writeln!(out, "- Revenue: {}\n", format_rupiah(window.revenue));
  }

  let _ = writeln!(out, "ORDERS BY STATUS:");
  for entry in &snapshot.by_status {
    let _ = writeln!(out, "- {}: {} orders", entry.status, entry.count);
  }

  let _ = writeln!(out, "\n{} MOST RECENT ORDERS:", RECENT_ORDER_LIMIT);
  for order in &snapshot.recent_orders {
    let _ = writeln!(out, "{}", order_row(order));
  }

  let _ = writeln!(out, "\nSERVICES ({} active):", snapshot.active_services);
  for service in &snapshot.services {
    let _ = writeln!(
      out,
      "- {}: {}/{} {} - {}",
      service.service_name,
      format_rupiah(service.price),
      service.unit,
      if service.is_active { "[active]" } else { "[inactive]" },
      service.description.as_deref().unwrap_or("No description")
    );
  }

  let _ = writeln!(out, "\nMOST POPULAR SERVICES:");
  for service in &snapshot.popular_services {
    let _ = writeln!(
      out,
      "- {}: ordered {}x (total {} {})",
      service.service_name,
      service.times_ordered,
      service.total_quantity.normalize(),
      service.unit
    );
  }

  let _ = writeln!(out, "\nACCOUNTS:");
  let _ = writeln!(out, "- Registered customers: {}", snapshot.accounts.customers);
  let _ = writeln!(out, "- Admins: {}", snapshot.accounts.admins);

  let _ = writeln!(out, "\nTOP {} CUSTOMERS:", TOP_LIMIT);
  for (rank, customer) in snapshot.top_customers.iter().enumerate() {
    let _ = writeln!(
      out,
      "{}. {} ({}): {} orders, total {}",
      rank + 1,
      customer.customer_name,
      customer.phone_number,
      customer.total_orders,
      format_rupiah(customer.total_spent)
    );
  }

  match order_lookup {
    Some(OrderLookup::Found(found)) => {
      let order = &found.order;
      let lines = found
        .details
        .iter()
        .map(|line| {
          format!(
            "{} ({} {} x {} = {})",
            line.service_name,
            line.quantity.normalize(),
            line.unit,
            format_rupiah(line.price),
            format_rupiah(line.subtotal)
          )
        })
        .collect::<Vec<_>>()
        .join(", ");
      let _ = writeln!(out, "\nORDER DETAIL {}:", order.order_number);
      let _ = writeln!(out, "- Customer: {}", order.customer_name);
      let _ = writeln!(out, "- Phone: {}", order.phone_number);
      let _ = writeln!(out, "- Address: {}", order.address.as_deref().unwrap_or("None"));
      let _ = writeln!(out, "- Status: {}", order.status);
      let _ = writeln!(out, "- Total: {}", format_rupiah(order.total_price));
      let _ = writeln!(out, "- Services: {}", lines);
      let _ = writeln!(out, "- Notes: {}", order.notes.as_deref().unwrap_or("None"));
      let _ = writeln!(out, "- Entered: {}", order.entry_date.format("%d/%m/%Y %H:%M"));
      let _ = writeln!(
        out,
        "- Completed: {}",
        order
          .completed_date
          .map(|d| d.format("%d/%m/%Y").to_string())
          .unwrap_or_else(|| "Not completed yet".to_string())
      );
    }
    Some(OrderLookup::Missing(number)) => {
      let _ = writeln!(out, "\nOrder {} was not found.", number);
    }
    None => {}
  }

  if let Some(search) = customer_search {
    if search.orders.is_empty() {
      let _ = writeln!(out, "\nNo orders found for \"{}\".", search.term);
    } else {
      let _ = writeln!(out, "\nORDERS FOR \"{}\" ({} found):", search.term, search.orders.len());
      for order in &search.orders {
        let _ = writeln!(out, "{}", order_row(order));
      }
    }
  }

  if let Some(service) = service_detail {
    let _ = writeln!(out, "\nSERVICE DETAIL \"{}\":", service.service_name);
    let _ = writeln!(out, "- Price: {} per {}", format_rupiah(service.price), service.unit);
    let _ = writeln!(out, "- Status: {}", if service.is_active { "active" } else { "inactive" });
    let _ = writeln!(
      out,
      "- Description: {}",
      service.description.as_deref().unwrap_or("No description")
    );
  }

  out
}

/// The user turn: data block, then the question.
pub fn user_prompt(context: &str, message: &str) -> String {
  format!("{}\n\n========== QUESTION ==========\n{}", context, message)
}
