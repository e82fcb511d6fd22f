// storefront/src/cart/session.rs

//! Per-client cart state and its debounced persistence to the saved cart.

use super::merge::merge_carts;
use crate::errors::{AppError, Result};
use crate::models::CartLine;
use crate::store::{Backend, CatalogStore, SavedCartStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

struct CartState {
  lines: Vec<CartLine>,
  user_id: Option<Uuid>,
  reconciled: bool,
  pending_sync: Option<JoinHandle<()>>,
  last_touched: Instant,
}

impl CartState {
  fn new() -> Self {
    Self {
      lines: Vec::new(),
      user_id: None,
      reconciled: false,
      pending_sync: None,
      last_touched: Instant::now(),
    }
  }
}

/// A client's local cart, optionally bound to a signed-in user.
///
/// Only a bound session that has been reconciled with the saved cart writes
/// to the store. Writes are debounced: each mutation restarts the timer and
/// the write carries the cart as it is when the timer fires.
pub struct CartSession {
  id: Uuid,
  backend: Arc<dyn Backend>,
  debounce: Duration,
  state: Mutex<CartState>,
}

impl CartSession {
  pub fn new(id: Uuid, backend: Arc<dyn Backend>, debounce: Duration) -> Arc<Self> {
    Arc::new(Self {
      id,
      backend,
      debounce,
      state: Mutex::new(CartState::new()),
    })
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn lines(&self) -> Vec<CartLine> {
    self.state.lock().lines.clone()
  }

  pub fn user_id(&self) -> Option<Uuid> {
    self.state.lock().user_id
  }

  pub fn is_reconciled(&self) -> bool {
    self.state.lock().reconciled
  }

  /// Time since the session was last read or changed through the registry.
  pub fn idle_for(&self) -> Duration {
    self.state.lock().last_touched.elapsed()
  }

  fn touch(&self) {
    self.state.lock().last_touched = Instant::now();
  }

  /// Checks that `caller` may see or change this cart.
  ///
  /// An unbound cart is open to anyone holding its id. A bound cart needs its
  /// own user's session; other users get `NotFound` so its existence is not revealed.
  pub fn ensure_accessible_by(&self, caller: Option<Uuid>) -> Result<()> {
    match (self.user_id(), caller) {
      (None, _) => Ok(()),
      (Some(owner), Some(caller)) if owner == caller => Ok(()),
      (Some(_), None) => Err(AppError::Auth("Sign in to use this cart.".to_string())),
      (Some(owner), Some(caller)) => {
        warn!(cart_session = %self.id, %owner, %caller, "Cart session used by another user.");
        Err(AppError::NotFound("Cart not found.".to_string()))
      }
    }
  }

  pub fn has_pending_sync(&self) -> bool {
    self
      .state
      .lock()
      .pending_sync
      .as_ref()
      .is_some_and(|handle| !handle.is_finished())
  }

  /// Adds `quantity` of a product, creating the line if needed.
  #[instrument(name = "CartSession::add_item", skip(self), fields(cart_session = %self.id), err(Display))]
  pub async fn add_item(self: &Arc<Self>, product_id: Uuid, quantity: i32) -> Result<Vec<CartLine>> {
    if quantity <= 0 {
      return Err(AppError::Validation("Quantity must be positive.".to_string()));
    }
    let current = self
      .state
      .lock()
      .lines
      .iter()
      .find(|l| l.product_id == product_id)
      .map_or(0, |l| l.quantity);
    let wanted = current
      .checked_add(quantity)
      .ok_or_else(|| AppError::Validation("Quantity is too large.".to_string()))?;
    self.ensure_purchasable(product_id, wanted).await?;

    Ok(self.mutate(|lines| match lines.iter_mut().find(|l| l.product_id == product_id) {
      Some(line) => line.quantity += quantity,
      None => lines.push(CartLine { product_id, quantity }),
    }))
  }

  /// Sets the quantity of a line. Zero removes it.
  #[instrument(name = "CartSession::set_quantity", skip(self), fields(cart_session = %self.id), err(Display))]
  pub async fn set_quantity(self: &Arc<Self>, product_id: Uuid, quantity: i32) -> Result<Vec<CartLine>> {
    if quantity < 0 {
      return Err(AppError::Validation("Quantity cannot be negative.".to_string()));
    }
    if quantity == 0 {
      return Ok(self.remove_item(product_id));
    }
    self.ensure_purchasable(product_id, quantity).await?;
    Ok(self.mutate(|lines| match lines.iter_mut().find(|l| l.product_id == product_id) {
      Some(line) => line.quantity = quantity,
      None => lines.push(CartLine { product_id, quantity }),
    }))
  }

  pub fn remove_item(self: &Arc<Self>, product_id: Uuid) -> Vec<CartLine> {
    self.mutate(|lines| lines.retain(|l| l.product_id != product_id))
  }

  pub fn clear(self: &Arc<Self>) -> Vec<CartLine> {
    self.mutate(Vec::clear)
  }

  /// Binds the session to `user_id` and merges the saved cart into the local one.
  ///
  /// The merge happens once per sign-in. Signing in again as the same user
  /// on a reconciled session leaves the cart untouched. Rebinding a session
  /// from one user to another drops the previous user's lines first. If the saved cart
  /// cannot be loaded the session stays bound but unreconciled, so nothing
  /// is written over the stored cart.
  #[instrument(name = "CartSession::sign_in", skip(self), fields(cart_session = %self.id))]
  pub async fn sign_in(self: &Arc<Self>, user_id: Uuid) -> Vec<CartLine> {
    {
      let mut state = self.state.lock();
      if state.user_id == Some(user_id) && state.reconciled {
        debug!("Cart session already reconciled for this user.");
        return state.lines.clone();
      }
      if let Some(previous) = state.user_id.filter(|bound| *bound != user_id) {
        cancel_pending(&mut state);
        state.reconciled = false;
        state.lines.clear();
        info!(cart_session = %self.id, %previous, %user_id, "Cart session rebound to another user.");
      }
      state.user_id = Some(user_id);
      state.last_touched = Instant::now();
    }

    let saved = match self.backend.load_saved_cart(user_id).await {
      Ok(saved) => saved.map(|c| c.items).unwrap_or_default(),
      Err(e) => {
        warn!(%user_id, error = %e, "Could not load saved cart; skipping reconciliation.");
        return self.lines();
      }
    };

    let merged = {
      let mut state = self.state.lock();
      if state.user_id != Some(user_id) || state.reconciled {
        return state.lines.clone();
      }
      state.lines = merge_carts(&state.lines, &saved);
      state.reconciled = true;
      state.lines.clone()
    };
    info!(%user_id, lines = merged.len(), saved_lines = saved.len(), "Cart reconciled with saved cart.");
    self.schedule_sync();
    merged
  }

  /// Cancels any pending write and unbinds the user. The local cart is kept.
  pub fn sign_out(&self) {
    let mut state = self.state.lock();
    cancel_pending(&mut state);
    if let Some(user_id) = state.user_id.take() {
      debug!(cart_session = %self.id, %user_id, "Cart session signed out.");
    }
    state.reconciled = false;
  }

  async fn ensure_purchasable(&self, product_id: Uuid, quantity: i32) -> Result<()> {
    let product = self
      .backend
      .get_product(product_id)
      .await?
      .filter(|p| p.is_active)
      .ok_or_else(|| AppError::NotFound(format!("Product {} not found.", product_id)))?;
    if product.stock_quantity < quantity {
      return Err(AppError::Validation(format!(
        "Only {} of '{}' in stock.",
        product.stock_quantity, product.name
      )));
    }
    Ok(())
  }

  fn mutate(self: &Arc<Self>, f: impl FnOnce(&mut Vec<CartLine>)) -> Vec<CartLine> {
    let lines = {
      let mut state = self.state.lock();
      f(&mut state.lines);
      state.last_touched = Instant::now();
      state.lines.clone()
    };
    self.schedule_sync();
    lines
  }

  /// Restarts the debounce timer for the saved-cart write.
  fn schedule_sync(self: &Arc<Self>) {
    let mut state = self.state.lock();
    if state.user_id.is_none() || !state.reconciled {
      return;
    }
    cancel_pending(&mut state);

    let session: Weak<CartSession> = Arc::downgrade(self);
    let delay = self.debounce;
    state.pending_sync = Some(tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      if let Some(session) = session.upgrade() {
        session.flush().await;
      }
    }));
  }

  async fn flush(&self) {
    let (user_id, lines) = {
      let state = self.state.lock();
      match state.user_id {
        Some(user_id) if state.reconciled => (user_id, state.lines.clone()),
        _ => return,
      }
    };
    match self.backend.upsert_saved_cart(user_id, &lines).await {
      Ok(()) => debug!(cart_session = %self.id, %user_id, lines = lines.len(), "Saved cart persisted."),
      Err(e) => warn!(cart_session = %self.id, %user_id, error = %e, "Saved cart sync failed."),
    }
  }
}

fn cancel_pending(state: &mut CartState) {
  if let Some(handle) = state.pending_sync.take() {
    handle.abort();
  }
}

/// In-process registry of cart sessions keyed by the `X-Cart-Session` id.
pub struct CartSessions {
  backend: Arc<dyn Backend>,
  debounce: Duration,
  sessions: Mutex<HashMap<Uuid, Arc<CartSession>>>,
}

impl CartSessions {
  pub fn new(backend: Arc<dyn Backend>, debounce: Duration) -> Self {
    Self {
      backend,
      debounce,
      sessions: Mutex::new(HashMap::new()),
    }
  }

  pub fn get_or_create(&self, id: Uuid) -> Arc<CartSession> {
    let session = self
      .sessions
      .lock()
      .entry(id)
      .or_insert_with(|| CartSession::new(id, self.backend.clone(), self.debounce))
      .clone();
    session.touch();
    session
  }

  pub fn get(&self, id: Uuid) -> Option<Arc<CartSession>> {
    let session = self.sessions.lock().get(&id).cloned()?;
    session.touch();
    Some(session)
  }

  /// Drops sessions idle for at least `ttl`. Sessions with a write still pending are kept.
  pub fn purge_idle(&self, ttl: Duration) -> usize {
    let mut sessions = self.sessions.lock();
    let before = sessions.len();
    sessions.retain(|_, session| session.has_pending_sync() || session.idle_for() < ttl);
    let purged = before - sessions.len();
    if purged > 0 {
      debug!(purged, remaining = sessions.len(), "Idle cart sessions purged.");
    }
    purged
  }

  pub fn len(&self) -> usize {
    self.sessions.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.sessions.lock().is_empty()
  }
}
