// storefront/src/web/handlers/appointment_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::appointments::{self, SlotTemplate};
use crate::errors::AppError;
use crate::models::{AppointmentStatus, UserRole};
use crate::services::mailer;
use crate::state::AppState;
use crate::store::{AppointmentStore, BookingOutcome, SlotQuery, UserStore};
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct SlotListQuery {
  pub nutritionist_id: Option<Uuid>,
  pub from: Option<DateTime<Utc>>,
  pub to: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
pub struct BookPayload {
  pub slot_id: Uuid,
  pub notes: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct BulkSlotsPayload {
  pub nutritionist_id: Uuid,
  #[serde(flatten)]
  pub template: SlotTemplate,
}

/// Unbooked slots that have not started yet.
#[instrument(name = "handler::list_available_slots", skip(app_state, query))]
pub async fn list_available_slots_handler(
  app_state: web::Data<AppState>,
  query: web::Query<SlotListQuery>,
) -> Result<HttpResponse, AppError> {
  let query = query.into_inner();
  let now = Utc::now();
  let from = query.from.map_or(now, |from| from.max(now));
  let slots = app_state
    .backend
    .list_slots(&SlotQuery {
      nutritionist_id: query.nutritionist_id,
      from: Some(from),
      to: query.to,
      only_available: true,
    })
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "slots": slots })))
}

#[instrument(
  name = "handler::book_appointment",
  skip(app_state, auth_user, req_payload),
  fields(user_id = %auth_user.id(), slot_id = %req_payload.slot_id)
)]
pub async fn book_appointment_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<BookPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let notes = payload.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

  let appointment = match app_state.backend.book_slot(payload.slot_id, auth_user.id(), notes).await? {
    BookingOutcome::Booked(appointment) => appointment,
    BookingOutcome::SlotTaken => {
      return Err(AppError::Conflict("This slot has already been booked.".to_string()));
    }
    BookingOutcome::SlotNotFound => {
      return Err(AppError::NotFound(format!("Slot {} not found.", payload.slot_id)));
    }
  };
  info!(appointment_id = %appointment.id, "Appointment booked.");

  let email_sent = mailer::send_best_effort(
    app_state.mailer.as_ref(),
    mailer::appointment_confirmation_email(&appointment, &auth_user.user),
  )
  .await;

  Ok(HttpResponse::Created().json(json!({
    "appointment": appointment,
    "confirmationEmailSent": email_sent,
  })))
}

/// Customers see the appointments they booked; nutritionists see the ones booked with them.
#[instrument(name = "handler::list_appointments", skip(app_state, auth_user), fields(user_id = %auth_user.id()))]
pub async fn list_appointments_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let appointments = match auth_user.user.role {
    UserRole::Nutritionist => app_state.backend.list_appointments_for_nutritionist(auth_user.id()).await?,
    _ => app_state.backend.list_appointments_for_customer(auth_user.id()).await?,
  };
  Ok(HttpResponse::Ok().json(json!({ "appointments": appointments })))
}

#[instrument(
  name = "handler::cancel_appointment",
  skip(app_state, auth_user, path),
  fields(user_id = %auth_user.id(), appointment_id = %path.as_ref())
)]
pub async fn cancel_appointment_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let appointment_id = path.into_inner();
  let not_found = || AppError::NotFound(format!("Appointment {} not found.", appointment_id));

  let appointment = app_state.backend.get_appointment(appointment_id).await?.ok_or_else(not_found)?;
  let user = &auth_user.user;
  let allowed =
    appointment.customer_id == user.id || appointment.nutritionist_id == user.id || user.role == UserRole::Admin;
  if !allowed {
    return Err(not_found());
  }
  if appointment.status == AppointmentStatus::Cancelled {
    return Err(AppError::Validation("Appointment is already cancelled.".to_string()));
  }

  let cancelled = app_state
    .backend
    .cancel_appointment(appointment_id)
    .await?
    .ok_or_else(not_found)?;
  info!("Appointment cancelled; slot released.");
  Ok(HttpResponse::Ok().json(json!({ "appointment": cancelled })))
}

/// Expands a weekly template into slots, skipping windows that overlap the calendar.
///
/// Admins may fill any nutritionist's calendar; a nutritionist only their own.
#[instrument(
  name = "handler::bulk_create_slots",
  skip(app_state, auth_user, req_payload),
  fields(user_id = %auth_user.id(), nutritionist_id = %req_payload.nutritionist_id)
)]
pub async fn bulk_create_slots_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<BulkSlotsPayload>,
) -> Result<HttpResponse, AppError> {
  let BulkSlotsPayload {
    nutritionist_id,
    template,
  } = req_payload.into_inner();

  let user = &auth_user.user;
  let is_self = user.role == UserRole::Nutritionist && user.id == nutritionist_id;
  if user.role != UserRole::Admin && !is_self {
    warn!("Slot creation refused for this user.");
    return Err(AppError::Forbidden(
      "Only admins or the nutritionist themself may create slots.".to_string(),
    ));
  }
  let nutritionist = app_state
    .backend
    .get_user(nutritionist_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} not found.", nutritionist_id)))?;
  if nutritionist.role != UserRole::Nutritionist {
    return Err(AppError::Validation(format!("User {} is not a nutritionist.", nutritionist_id)));
  }

  let windows = appointments::generate_slots(&template)?;
  let existing = app_state
    .backend
    .list_slots(&SlotQuery {
      nutritionist_id: Some(nutritionist_id),
      from: Some(template.from_date.and_time(template.day_start).and_utc() - Duration::days(1)),
      to: Some(template.to_date.and_time(template.day_end).and_utc() + Duration::days(1)),
      only_available: false,
    })
    .await?;
  let (fresh, skipped) = appointments::drop_overlapping(windows, &existing);
  let created = app_state.backend.insert_slots(nutritionist_id, &fresh).await?;
  info!(created = created.len(), skipped, "Slots generated.");

  Ok(HttpResponse::Created().json(json!({
    "created": created.len(),
    "skipped": skipped,
    "slots": created,
  })))
}
