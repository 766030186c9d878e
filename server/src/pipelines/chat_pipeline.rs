// server/src/pipelines/chat_pipeline.rs

use crate::errors::AppError;
use crate::models::TimeWindow;
use crate::pipelines::contexts::ChatCtxData;
use crate::services::chat_context::{
  self, ChatSnapshot, CustomerSearch, OrderLookup, CUSTOMER_SEARCH_LIMIT, FALLBACK_REPLY, RECENT_ORDER_LIMIT,
  SYSTEM_PROMPT, TOP_LIMIT,
};
use crate::services::completion_client::{ChatMessage, CompletionRequest};
use crate::services::{order_engine, order_numbers};
use chrono::Utc;
use laundry_flow::{skip_when, ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{event, info, Level};

/// Registers the admin chat assistant pipeline.
pub fn register_chat_pipeline(flows: &FlowRegistry<AppError>) {
  let mut chat_p = Pipeline::<ChatCtxData, AppError>::new(&[
    ("validate_message", false, None),
    ("gather_statistics", false, None),
    (
      "lookup_order",
      false,
      Some(skip_when(|c: &ChatCtxData| order_numbers::find_order_number(&c.message).is_none())),
    ),
    (
      "search_customers",
      false,
      Some(skip_when(|c: &ChatCtxData| !chat_context::mentions_customer(&c.message))),
    ),
    (
      "lookup_service",
      false,
      Some(skip_when(|c: &ChatCtxData| !chat_context::mentions_service(&c.message))),
    ),
    ("ask_assistant", false, None),
  ]);

  // Step 1: Reject blank messages before any query or outbound call
  chat_p.on_root("validate_message", |ctx_data: ContextData<ChatCtxData>| {
    Box::pin(async move {
      if ctx_data.with(|c| c.message.trim().is_empty()) {
        return Err(AppError::BadRequest("Message must not be empty".to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 2: Snapshot the business figures the assistant answers from.
  // Every query runs concurrently; the first failure aborts the request.
  chat_p.on_root("gather_statistics", |ctx_data: ContextData<ChatCtxData>| {
    Box::pin(async move {
      let (reports, catalog) = ctx_data.with(|c| (c.app_state.stores.reports.clone(), c.app_state.stores.catalog.clone()));
      let now = Utc::now();
      let (today_from, today_to) = TimeWindow::Today.bounds(now);
      let (week_from, week_to) = TimeWindow::ThisWeek.bounds(now);
      let (month_from, month_to) = TimeWindow::ThisMonth.bounds(now);

      let (
        stats,
        today,
        this_week,
        this_month,
        by_status,
        recent_orders,
        services,
        active_services,
        popular_services,
        accounts,
        top_customers,
      ) = futures_util::try_join!(
        reports.order_stats(None),
        reports.window_stats(today_from, today_to),
        reports.window_stats(week_from, week_to),
        reports.window_stats(month_from, month_to),
        reports.orders_by_status(),
        reports.recent_orders(RECENT_ORDER_LIMIT),
        catalog.list_services(),
        reports.active_service_count(),
        reports.popular_services(TOP_LIMIT),
        reports.account_counts(),
        reports.top_customers(TOP_LIMIT),
      )?;

      event!(Level::DEBUG, total_orders = stats.total_orders, "Chat statistics gathered.");
      ctx_data.write().snapshot = Some(ChatSnapshot {
        stats,
        today,
        this_week,
        this_month,
        by_status,
        recent_orders,
        services,
        active_services,
        popular_services,
        accounts,
        top_customers,
      });
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 3: Attach the order the message names, if any. A number that matches
  // nothing is still reported so the assistant can say so.
  chat_p.on_root("lookup_order", |ctx_data: ContextData<ChatCtxData>| {
    Box::pin(async move {
      let (number, stores) = ctx_data.with(|c| (order_numbers::find_order_number(&c.message), c.app_state.stores.clone()));
      let Some(number) = number else {
        return Ok::<_, AppError>(PipelineControl::Continue);
      };

      let lookup = match stores.reports.find_order_by_number(&number).await? {
        Some(order) => OrderLookup::Found(order_engine::load_order(stores.orders.as_ref(), order.id, None).await?),
        None => OrderLookup::Missing(number.clone()),
      };
      event!(Level::DEBUG, %number, found = matches!(lookup, OrderLookup::Found(_)), "Order lookup for chat.");
      ctx_data.write().order_lookup = Some(lookup);
      Ok(PipelineControl::Continue)
    })
  });

  // Step 4: Search orders by customer name when the message asks about a customer
  chat_p.on_root("search_customers", |ctx_data: ContextData<ChatCtxData>| {
    Box::pin(async move {
      let (term, reports) = ctx_data.with(|c| {
        (
          chat_context::customer_search_term(&c.message),
          c.app_state.stores.reports.clone(),
        )
      });
      let Some(term) = term else {
        return Ok::<_, AppError>(PipelineControl::Continue);
      };

      let orders = reports.search_orders(&term, CUSTOMER_SEARCH_LIMIT).await?;
      event!(Level::DEBUG, %term, matches = orders.len(), "Customer search for chat.");
      ctx_data.write().customer_search = Some(CustomerSearch { term, orders });
      Ok(PipelineControl::Continue)
    })
  });

  // Step 5: Match a service by name against the catalog already in the snapshot,
  // so no extra query is needed
  chat_p.on_root("lookup_service", |ctx_data: ContextData<ChatCtxData>| {
    Box::pin(async move {
      ctx_data.update(|c| {
        let found = c
          .snapshot
          .as_ref()
          .and_then(|snapshot| chat_context::match_service(&snapshot.services, &c.message))
          .cloned();
        c.service_detail = found;
      });
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 6: Build the prompt and ask the completion API.
  // The assistant is only checked here, so a missing key still validates input first.
  chat_p.on_root("ask_assistant", |ctx_data: ContextData<ChatCtxData>| {
    Box::pin(async move {
      let (assistant, request) = ctx_data.with(|c| {
        let snapshot = c.snapshot.clone().unwrap_or_default();
        let context = chat_context::build_context(
          &snapshot,
          c.order_lookup.as_ref(),
          c.customer_search.as_ref(),
          c.service_detail.as_ref(),
        );
        let chat = &c.app_state.config.chat;
        let request = CompletionRequest {
          model: chat.model.clone(),
          messages: vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(chat_context::user_prompt(&context, &c.message)),
          ],
          temperature: chat.temperature,
          max_tokens: chat.max_tokens,
        };
        (c.app_state.assistant.clone(), request)
      });

      let assistant = assistant
        .ok_or_else(|| AppError::Internal("Assistant is not configured, contact administrator.".to_string()))?;
      let reply = assistant.complete(&request).await?;
      if reply.is_none() {
        info!("Assistant returned no content; using the fallback reply.");
      }
      ctx_data.write().reply = Some(reply.unwrap_or_else(|| FALLBACK_REPLY.to_string()));
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(chat_p);
  tracing::info!("Chat assistant pipeline registered.");
}
