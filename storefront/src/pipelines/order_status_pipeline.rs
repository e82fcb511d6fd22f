// storefront/src/pipelines/order_status_pipeline.rs

use crate::errors::AppError;
use crate::models::{InvoiceStatus, OrderStatus};
use crate::pipelines::common_steps::release_stock;
use crate::pipelines::contexts::OrderStatusCtxData;
use crate::services::mailer;
use crate::store::{InvoiceStore, OrderStatusUpdate, OrderStore, StatusChange};
use shopflow::{ContextData, FlowRegistry, Pipeline, StepControl, StepDef};
use tracing::{info, warn};

pub fn build_order_status_pipeline() -> Pipeline<OrderStatusCtxData, AppError> {
  let mut p = Pipeline::<OrderStatusCtxData, AppError>::new(
    "order_status",
    [
      StepDef::required("validate_status_transition"),
      StepDef::required("persist_order_status"),
      StepDef::required("restock_cancelled_order")
        .skip_if(|data: &OrderStatusCtxData| data.new_status != OrderStatus::Cancelled),
      StepDef::required("settle_invoice"),
      StepDef::optional("notify_customer_of_status"),
    ],
  );

  p.on_step("validate_status_transition", |ctx_data: ContextData<OrderStatusCtxData>| async move {
    let (backend, order_id, new_status) = {
      let guard = ctx_data.read();
      (guard.app_state.backend.clone(), guard.order_id, guard.new_status)
    };
    let order = backend
      .get_order(order_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))?;
    if !order.status.can_transition_to(new_status) {
      return Err(AppError::Validation(format!(
        "Cannot change order status from {} to {}.",
        order.status, new_status
      )));
    }
    ctx_data.update(|data| {
      data.previous_status = Some(order.status);
      data.order = Some(order);
    });
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("persist_order_status", |ctx_data: ContextData<OrderStatusCtxData>| async move {
    let (backend, order_id, previous, new_status, update) = {
      let guard = ctx_data.read();
      let previous = guard
        .previous_status
        .ok_or_else(|| AppError::Internal("Order status must be validated before it is persisted.".to_string()))?;
      let update = OrderStatusUpdate {
        tracking_number: guard.tracking_number.clone(),
        payment_reference: guard.payment_reference.clone(),
      };
      (guard.app_state.backend.clone(), guard.order_id, previous, guard.new_status, update)
    };
    match backend.update_order_status(order_id, previous, new_status, &update).await? {
      StatusChange::Applied(order) => {
        info!(%order_id, from = %previous, status = %new_status, "Order status changed.");
        ctx_data.write().order = Some(order);
        Ok::<_, AppError>(StepControl::Continue)
      }
      StatusChange::Stale { current } => {
        warn!(%order_id, expected = %previous, %current, "Order status changed concurrently.");
        Err(AppError::Conflict(format!(
          "Order {} is now {}; its status was changed by another request.",
          order_id, current
        )))
      }
      StatusChange::NotFound => Err(AppError::NotFound(format!("Order {} not found.", order_id))),
    }
  });

  p.on_step("restock_cancelled_order", |ctx_data: ContextData<OrderStatusCtxData>| async move {
    let (backend, order_id) = {
      let guard = ctx_data.read();
      (guard.app_state.backend.clone(), guard.order_id)
    };
    let units: Vec<_> = backend
      .order_items(order_id)
      .await?
      .into_iter()
      .map(|item| (item.product_id, item.quantity))
      .collect();
    let restored = release_stock(backend.as_ref(), &units).await;
    ctx_data.write().restocked_units = restored;
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("settle_invoice", |ctx_data: ContextData<OrderStatusCtxData>| async move {
    let (backend, order_id, new_status) = {
      let guard = ctx_data.read();
      (guard.app_state.backend.clone(), guard.order_id, guard.new_status)
    };
    let target = match new_status {
      OrderStatus::Paid => InvoiceStatus::Paid,
      OrderStatus::Cancelled => InvoiceStatus::Void,
      _ => return Ok(StepControl::Continue),
    };
    match backend.invoice_for_order(order_id).await? {
      Some(invoice) if invoice.status != target => {
        let invoice = backend.set_invoice_status(invoice.id, target).await?;
        ctx_data.write().invoice = invoice;
      }
      Some(invoice) => ctx_data.write().invoice = Some(invoice),
      None => warn!(%order_id, "Order has no invoice to settle."),
    }
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("notify_customer_of_status", |ctx_data: ContextData<OrderStatusCtxData>| async move {
    let (mail, order) = {
      let guard = ctx_data.read();
      (guard.app_state.mailer.clone(), guard.order.clone())
    };
    if let Some(order) = order {
      let sent = mailer::send_best_effort(mail.as_ref(), mailer::order_status_email(&order)).await;
      ctx_data.write().customer_notified = sent;
    }
    Ok::<_, AppError>(StepControl::Continue)
  });

  p
}

pub fn register_order_status_pipeline(flows: &FlowRegistry<AppError>) {
  flows.register(build_order_status_pipeline());
  tracing::info!("Order status pipeline registered.");
}
