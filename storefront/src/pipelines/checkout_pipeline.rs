// storefront/src/pipelines/checkout_pipeline.rs

use crate::errors::AppError;
use crate::models::{InvoiceStatus, OrderStatus};
use crate::pipelines::common_steps::release_stock;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::pricing::{self, PricedLine};
use crate::services::{auth_service, mailer};
use crate::store::{
  Backend, CatalogStore, DiscountStore, InvoiceStore, NewOrder, NewOrderItem, OrderStatusUpdate, OrderStore,
  PaymentMethodStore, StatusChange, StockChange,
};
use chrono::Utc;
use shopflow::{ContextData, FlowRegistry, Pipeline, StepControl, StepDef};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub fn build_checkout_pipeline() -> Pipeline<CheckoutCtxData, AppError> {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(
    "checkout",
    [
      StepDef::required("load_cart_for_checkout"),
      StepDef::required("validate_shipping_details"),
      StepDef::required("resolve_payment_method"),
      StepDef::required("price_order"),
      StepDef::required("reserve_stock"),
      StepDef::required("create_order_record"),
      StepDef::required("charge_card_payment").skip_if(|data: &CheckoutCtxData| !data.pays_by_card()),
      StepDef::required("issue_invoice"),
      StepDef::optional("redeem_discount").skip_if(|data: &CheckoutCtxData| data.discount.is_none()),
      StepDef::required("clear_checked_out_cart"),
      StepDef::optional("send_order_confirmation"),
    ],
  );

  p.on_step("load_cart_for_checkout", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let (session, user_id) = {
      let guard = ctx_data.read();
      (guard.cart_session.clone(), guard.user.id)
    };
    session.ensure_accessible_by(Some(user_id))?;
    let lines = session.lines();
    if lines.is_empty() {
      return Err(AppError::Validation("Your cart is empty.".to_string()));
    }
    ctx_data.write().lines = lines;
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("validate_shipping_details", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let shipping = ctx_data.read().shipping.clone();
    let name = shipping.name.trim().to_string();
    let address = shipping.address.trim().to_string();
    if name.is_empty() || address.is_empty() {
      return Err(AppError::Validation("Shipping name and address are required.".to_string()));
    }
    let email = auth_service::normalize_email(&shipping.email)?;
    ctx_data.update(|data| {
      data.shipping.name = name;
      data.shipping.email = email;
      data.shipping.address = address;
    });
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("resolve_payment_method", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let (backend, method_id) = {
      let guard = ctx_data.read();
      (guard.app_state.backend.clone(), guard.payment_method_id)
    };
    let method = backend
      .get_payment_method(method_id)
      .await?
      .filter(|m| m.is_active)
      .ok_or_else(|| AppError::Validation("The selected payment method is not available.".to_string()))?;
    ctx_data.write().payment_method = Some(method);
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("price_order", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let (backend, lines, code) = {
      let guard = ctx_data.read();
      (guard.app_state.backend.clone(), guard.lines.clone(), guard.discount_code.clone())
    };
    let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let products = backend.get_products(&ids).await?;

    let mut priced_lines = Vec::with_capacity(lines.len());
    for line in &lines {
      let product = products
        .iter()
        .find(|p| p.id == line.product_id && p.is_active)
        .ok_or_else(|| AppError::Validation(format!("Product {} is no longer available.", line.product_id)))?;
      priced_lines.push(PricedLine {
        product_id: product.id,
        product_name: product.name.clone(),
        quantity: line.quantity,
        unit_price_cents: product.price_cents,
      });
    }

    let discount = match code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
      Some(code) => Some(
        backend
          .find_discount_by_code(code)
          .await?
          .ok_or_else(|| AppError::Validation(format!("Unknown discount code '{}'.", code)))?,
      ),
      None => None,
    };
    let quote = pricing::quote(&priced_lines, discount.as_ref(), Utc::now())?;
    info!(
      subtotal_cents = quote.subtotal_cents,
      discount_cents = quote.discount_cents,
      total_cents = quote.total_cents,
      "Order priced."
    );

    ctx_data.update(|data| {
      data.priced_lines = priced_lines;
      data.discount = discount;
      data.quote = Some(quote);
    });
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("reserve_stock", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let (backend, priced_lines) = {
      let guard = ctx_data.read();
      (guard.app_state.backend.clone(), guard.priced_lines.clone())
    };
    let mut reserved: Vec<(Uuid, i32)> = Vec::with_capacity(priced_lines.len());
    for line in &priced_lines {
      match backend.adjust_stock(line.product_id, -line.quantity).await {
        Ok(StockChange::Applied(_)) => reserved.push((line.product_id, line.quantity)),
        Ok(StockChange::Insufficient { available }) => {
          release_stock(backend.as_ref(), &reserved).await;
          return Err(AppError::Validation(format!(
            "Only {} of '{}' left in stock.",
            available, line.product_name
          )));
        }
        Ok(StockChange::NotFound) => {
          release_stock(backend.as_ref(), &reserved).await;
          return Err(AppError::Validation(format!(
            "Product '{}' is no longer available.",
            line.product_name
          )));
        }
        Err(e) => {
          release_stock(backend.as_ref(), &reserved).await;
          return Err(e);
        }
      }
    }
    ctx_data.write().reserved = reserved;
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("create_order_record", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let (backend, new_order, reserved) = {
      let guard = ctx_data.read();
      let quote = guard
        .quote
        .ok_or_else(|| AppError::Internal("Order must be priced before it is recorded.".to_string()))?;
      let new_order = NewOrder {
        id: Uuid::new_v4(),
        user_id: guard.user.id,
        subtotal_cents: quote.subtotal_cents,
        discount_cents: quote.discount_cents,
        total_cents: quote.total_cents,
        currency: guard.app_state.config.currency.clone(),
        discount_code: guard.discount.as_ref().map(|d| d.code.clone()),
        payment_method_id: guard.payment_method_id,
        shipping_name: guard.shipping.name.clone(),
        shipping_email: guard.shipping.email.clone(),
        shipping_address: guard.shipping.address.clone(),
        items: guard
          .priced_lines
          .iter()
          .map(|l| NewOrderItem {
            product_id: l.product_id,
            product_name: l.product_name.clone(),
            quantity: l.quantity,
            unit_price_cents: l.unit_price_cents,
          })
          .collect(),
      };
      (guard.app_state.backend.clone(), new_order, guard.reserved.clone())
    };

    match backend.create_order(&new_order).await {
      Ok((order, items)) => {
        info!(order_id = %order.id, total_cents = order.total_cents, "Order recorded.");
        ctx_data.update(|data| {
          data.order = Some(order);
          data.order_items = items;
        });
        Ok::<_, AppError>(StepControl::Continue)
      }
      Err(e) => {
        error!(error = %e, "Order could not be recorded; releasing stock.");
        release_stock(backend.as_ref(), &reserved).await;
        ctx_data.write().reserved.clear();
        Err(e)
      }
    }
  });

  p.on_step("charge_card_payment", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let (state, order, reserved) = {
      let guard = ctx_data.read();
      let order = guard
        .order
        .clone()
        .ok_or_else(|| AppError::Internal("Order missing at payment.".to_string()))?;
      (guard.app_state.clone(), order, guard.reserved.clone())
    };

    let charge = async {
      if order.total_cents == 0 {
        return Ok(None);
      }
      let mut intent = state
        .payments
        .create_intent(order.id, order.total_cents, &order.currency)
        .await?;
      state.payments.confirm(&mut intent).await?;
      Ok::<_, AppError>(Some(intent))
    };

    match charge.await {
      Ok(intent) => {
        let update = OrderStatusUpdate {
          payment_reference: intent.as_ref().map(|i| i.id.clone()),
          ..Default::default()
        };
        let marked = state
          .backend
          .update_order_status(order.id, OrderStatus::Pending, OrderStatus::Paid, &update)
          .await;
        match marked {
          Ok(StatusChange::Applied(paid)) => {
            info!(order_id = %order.id, "Card payment captured.");
            ctx_data.update(|data| {
              data.order = Some(paid);
              data.payment_intent = intent;
            });
          }
          // The charge went through, so the order and its stock are kept for an admin to settle.
          other => {
            error!(
              order_id = %order.id,
              payment_reference = ?update.payment_reference,
              outcome = ?other,
              "Card payment captured but the order could not be marked paid."
            );
            ctx_data.write().payment_intent = intent;
          }
        }
        Ok(StepControl::Continue)
      }
      Err(AppError::Payment(reason)) => {
        warn!(order_id = %order.id, %reason, "Card payment failed; cancelling order.");
        abandon_order(&state.backend, order.id, &reserved).await;
        ctx_data.update(|data| {
          data.reserved.clear();
          data.payment_failure = Some(reason);
        });
        Ok(StepControl::Stop)
      }
      Err(other) => {
        abandon_order(&state.backend, order.id, &reserved).await;
        ctx_data.write().reserved.clear();
        Err(other)
      }
    }
  });

  p.on_step("issue_invoice", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let (backend, order, charged, reserved) = {
      let guard = ctx_data.read();
      (
        guard.app_state.backend.clone(),
        guard.order.clone(),
        guard.payment_intent.is_some(),
        guard.reserved.clone(),
      )
    };
    let order = order.ok_or_else(|| AppError::Internal("Order missing at invoicing.".to_string()))?;
    let status = if order.status == OrderStatus::Paid {
      InvoiceStatus::Paid
    } else {
      InvoiceStatus::Issued
    };
    match backend.create_invoice(&order, status).await {
      Ok(invoice) => {
        info!(order_id = %order.id, invoice = %invoice.number, "Invoice issued.");
        ctx_data.write().invoice = Some(invoice);
        Ok::<_, AppError>(StepControl::Continue)
      }
      Err(e) if charged || order.status == OrderStatus::Paid => {
        error!(order_id = %order.id, error = %e, "Invoice could not be issued for a paid order; keeping the order.");
        Ok(StepControl::Continue)
      }
      Err(e) => {
        error!(order_id = %order.id, error = %e, "Invoice could not be issued; cancelling order.");
        abandon_order(&backend, order.id, &reserved).await;
        ctx_data.write().reserved.clear();
        Err(e)
      }
    }
  });

  p.on_step("redeem_discount", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let (backend, discount) = {
      let guard = ctx_data.read();
      (guard.app_state.backend.clone(), guard.discount.clone())
    };
    if let Some(discount) = discount {
      match backend.redeem_discount(discount.id).await {
        Ok(true) => info!(code = %discount.code, "Discount use recorded."),
        Ok(false) => warn!(code = %discount.code, "Discount reached its usage limit concurrently."),
        Err(e) => warn!(code = %discount.code, error = %e, "Could not record discount use."),
      }
    }
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("clear_checked_out_cart", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let session = ctx_data.read().cart_session.clone();
    session.clear();
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("send_order_confirmation", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let (mail, order, items) = {
      let guard = ctx_data.read();
      (guard.app_state.mailer.clone(), guard.order.clone(), guard.order_items.clone())
    };
    if let Some(order) = order {
      let sent = mailer::send_best_effort(mail.as_ref(), mailer::order_confirmation_email(&order, &items)).await;
      ctx_data.write().confirmation_sent = sent;
    }
    Ok::<_, AppError>(StepControl::Continue)
  });

  p
}

/// Cancels a still-pending order and gives its stock back.
///
/// Stock is only released once the cancellation is recorded, so an order left
/// pending keeps its reservation until an admin cancels it.
async fn abandon_order(backend: &Arc<dyn Backend>, order_id: Uuid, reserved: &[(Uuid, i32)]) {
  let cancelled = backend
    .update_order_status(order_id, OrderStatus::Pending, OrderStatus::Cancelled, &OrderStatusUpdate::default())
    .await;
  match cancelled {
    Ok(StatusChange::Applied(_)) => {
      release_stock(backend.as_ref(), reserved).await;
    }
    Ok(other) => warn!(%order_id, outcome = ?other, "Order was not pending; stock left as is."),
    Err(e) => error!(%order_id, error = %e, "Could not cancel order; its stock stays reserved."),
  }
}

pub fn register_checkout_pipeline(flows: &FlowRegistry<AppError>) {
  flows.register(build_checkout_pipeline());
  tracing::info!("Checkout pipeline registered.");
}
