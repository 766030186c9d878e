// server/src/pipelines/order_pipeline.rs

use crate::errors::AppError;
use crate::models::order::order_total;
use crate::models::{NewOrder, NewOrderLine, OrderStatus};
use crate::pipelines::contexts::CreateOrderCtxData;
use crate::services::{order_engine, validation};
use chrono::Utc;
use laundry_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{event, info, warn, Level};

/// Registers the order creation pipeline.
pub fn register_create_order_pipeline(flows: &FlowRegistry<AppError>) {
  let mut order_p = Pipeline::<CreateOrderCtxData, AppError>::new(&[
    ("validate_order_input", false, None),
    ("price_items", false, None),
    ("assign_order_number", false, None),
    ("persist_order", false, None),
    ("load_created_order", false, None),
  ]);

  // Step 1: Validate header fields and items
  order_p.on_root("validate_order_input", |ctx_data: ContextData<CreateOrderCtxData>| {
    Box::pin(async move {
      ctx_data.with(|c| {
        validation::order_header(&c.customer_name, &c.phone_number)?;
        validation::order_items(&c.items)
      })?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 2: Price every line from the live catalog
  order_p.on_root("price_items", |ctx_data: ContextData<CreateOrderCtxData>| {
    Box::pin(async move {
      let (items, catalog) = ctx_data.with(|c| (c.items.clone(), c.app_state.stores.catalog.clone()));

      let mut lines = Vec::with_capacity(items.len());
      for item in &items {
        let service = catalog
          .find_service(item.service_id)
          .await?
          .filter(|service| service.is_active)
          .ok_or_else(|| AppError::BadRequest(format!("Service {} not found or inactive", item.service_id)))?;

        if let Some(client_price) = item.price {
          if client_price != service.price {
            warn!(
              service_id = service.id,
              %client_price,
              catalog_price = %service.price,
              "Client price differs from the catalog; using the catalog price."
            );
          }
        }
        lines.push(NewOrderLine::priced(service.id, item.quantity, service.price));
      }

      let total = order_total(&lines);
      event!(Level::DEBUG, lines = lines.len(), %total, "Order priced.");
      ctx_data.update(|c| {
        c.priced_lines = lines;
        c.total_price = total;
      });
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 3: Assign the order number
  order_p.on_root("assign_order_number", |ctx_data: ContextData<CreateOrderCtxData>| {
    Box::pin(async move {
      ctx_data.update(|c| c.order_number = Some(c.app_state.order_numbers.next()));
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 4: Header and lines in one transaction
  order_p.on_root("persist_order", |ctx_data: ContextData<CreateOrderCtxData>| {
    Box::pin(async move {
      let (new_order, lines, orders) = ctx_data.with(|c| {
        let order_number = c
          .order_number
          .clone()
          .ok_or_else(|| AppError::Internal("Order number missing before persisting".to_string()))?;
        let new_order = NewOrder {
          order_number,
          user_id: Some(c.account_id),
          customer_name: c.customer_name.trim().to_string(),
          phone_number: c.phone_number.trim().to_string(),
          address: c.address.clone().filter(|a| !a.trim().is_empty()),
          notes: c.notes.clone().filter(|n| !n.trim().is_empty()),
          status: OrderStatus::Queued,
          total_price: c.total_price,
          entry_date: Utc::now(),
        };
        Ok::<_, AppError>((new_order, c.priced_lines.clone(), c.app_state.stores.orders.clone()))
      })?;

      let order_id = order_engine::persist_order(orders.as_ref(), &new_order, &lines).await?;
      ctx_data.write().order_id = Some(order_id);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  order_p.after_root("persist_order", |ctx_data: ContextData<CreateOrderCtxData>| {
    Box::pin(async move {
      ctx_data.with(|c| {
        info!(
          account_id = c.account_id,
          order_id = ?c.order_id,
          order_number = ?c.order_number,
          total = %c.total_price,
          "Order created."
        )
      });
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 5: Read the order back with its joined lines
  order_p.on_root("load_created_order", |ctx_data: ContextData<CreateOrderCtxData>| {
    Box::pin(async move {
      let (order_id, orders) = ctx_data.with(|c| (c.order_id, c.app_state.stores.orders.clone()));
      let order_id = order_id.ok_or_else(|| AppError::Internal("Order id missing after persisting".to_string()))?;

      let created = order_engine::load_order(orders.as_ref(), order_id, None).await?;
      ctx_data.write().created = Some(created);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(order_p);
  tracing::info!("Order creation pipeline registered.");
}
