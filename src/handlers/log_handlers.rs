use crate::auth::AuthenticatedUser;
use crate::db::DbPool;
use crate::error::ServiceError;
use crate::models::{
    validate_ingest_fields, Channel, Event, EventWindowParams, IngestEventPayload, NewChannel,
    NewEvent, Project,
};
use crate::schema::{channels, events, projects};
use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

async fn project_for_user(
    conn: &mut AsyncPgConnection,
    caller: Uuid,
    project_name: &str,
) -> Result<Option<Project>, ServiceError> {
    projects::table
        .filter(projects::user_id.eq(caller))
        .filter(projects::name.eq(project_name))
        .select(Project::as_select())
        .first::<Project>(conn)
        .await
        .optional()
        .map_err(ServiceError::from)
}

async fn channel_in_project(
    conn: &mut AsyncPgConnection,
    caller: Uuid,
    project: Uuid,
    channel_name: &str,
) -> Result<Option<Channel>, ServiceError> {
    channels::table
        .filter(channels::user_id.eq(caller))
        .filter(channels::project_id.eq(project))
        .filter(channels::name.eq(channel_name))
        .select(Channel::as_select())
        .first::<Channel>(conn)
        .await
        .optional()
        .map_err(ServiceError::from)
}

/// Inclusive `created_at` bounds for the per-channel listing. A `start`
/// without an `end` is capped at request time.
fn event_time_window(
    params: &EventWindowParams,
    now: DateTime<Utc>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match (params.start, params.end) {
        (Some(start), Some(end)) => (Some(start), Some(end)),
        (Some(start), None) => (Some(start), Some(now)),
        (None, Some(end)) => (None, Some(end)),
        (None, None) => (None, None),
    }
}

// === GET /log/ ===
#[get("")]
pub async fn list_events_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let caller = authenticated_user.id;

    let mut conn = pool.get().await?;

    let event_list = events::table
        .filter(events::user_id.eq(caller))
        .order(events::created_at.asc())
        .select(Event::as_select())
        .load::<Event>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    Ok(HttpResponse::Ok().json(event_list))
}

// === POST /log/ ===
//
// Resolves the project and channel by name. A channel unknown within the
// project is created on first use; that insert and the event insert run in
// one transaction so a failed event insert never leaves a channel behind.
#[post("")]
pub async fn ingest_event_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    payload: web::Json<IngestEventPayload>,
) -> Result<HttpResponse, ServiceError> {
    let caller = authenticated_user.id;
    log::info!("User {} posting log entry: {:?}", caller, payload);

    let (project_name, channel_name, event_name) =
        match (&payload.project, &payload.channel, &payload.event) {
            (Some(p), Some(c), Some(e)) => (p.as_str(), c.as_str(), e.as_str()),
            _ => {
                return Err(ServiceError::BadRequest(
                    "Required fields are empty.".to_string(),
                ))
            }
        };

    validate_ingest_fields(channel_name, event_name, payload.icon.as_deref())?;

    let mut conn = pool.get().await?;

    let project = project_for_user(&mut conn, caller, project_name)
        .await?
        .ok_or_else(|| {
            ServiceError::BadRequest("Project does not exist for user.".to_string())
        })?;

    // Owned copies for the transaction closure.
    let channel_name = channel_name.to_string();
    let new_event_fields = (
        event_name.to_string(),
        payload.description.clone(),
        payload.icon.clone(),
    );
    let project_id = project.id;

    let event = conn
        .transaction::<Event, ServiceError, _>(|conn| {
            async move {
                let channel =
                    match channel_in_project(conn, caller, project_id, &channel_name).await? {
                        Some(existing) => existing,
                        None => {
                            let new_channel_data = NewChannel {
                                user_id: caller,
                                project_id,
                                name: channel_name.clone(),
                            };
                            diesel::insert_into(channels::table)
                                .values(&new_channel_data)
                                .get_result::<Channel>(conn)
                                .await
                                .map_err(|e| {
                                    log::error!("Failed to auto-create channel: {:?}", e);
                                    ServiceError::InternalServerError(
                                        "Server error when saving new channel.".to_string(),
                                    )
                                })?
                        }
                    };

                let (event_name, description, icon) = new_event_fields;
                let new_event_data = NewEvent {
                    user_id: caller,
                    project_id,
                    channel_id: channel.id,
                    event_name,
                    description,
                    icon,
                };

                let event = diesel::insert_into(events::table)
                    .values(&new_event_data)
                    .get_result::<Event>(conn)
                    .await
                    .map_err(ServiceError::from)?;

                Ok(event)
            }
            .scope_boxed()
        })
        .await?;

    Ok(HttpResponse::Created().json(event))
}

// === GET /log/{project}/ ===
#[get("/{project}")]
pub async fn list_project_events_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let caller = authenticated_user.id;
    let project_name = path.into_inner();

    let mut conn = pool.get().await?;

    let project = project_for_user(&mut conn, caller, &project_name)
        .await?
        .ok_or_else(|| {
            ServiceError::BadRequest("Project name for user could not be found.".to_string())
        })?;

    let event_list = events::table
        .filter(events::user_id.eq(caller))
        .filter(events::project_id.eq(project.id))
        .order(events::created_at.asc())
        .select(Event::as_select())
        .load::<Event>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    Ok(HttpResponse::Ok().json(event_list))
}

// === GET /log/{project}/{channel}/ ===
#[get("/{project}/{channel}")]
pub async fn list_channel_events_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    path: web::Path<(String, String)>,
    query: web::Query<EventWindowParams>,
) -> Result<HttpResponse, ServiceError> {
    let caller = authenticated_user.id;
    let (project_name, channel_name) = path.into_inner();

    let mut conn = pool.get().await?;

    let project = project_for_user(&mut conn, caller, &project_name)
        .await?
        .ok_or_else(|| {
            ServiceError::BadRequest("Project name for user could not be found.".to_string())
        })?;

    let channel = channel_in_project(&mut conn, caller, project.id, &channel_name)
        .await?
        .ok_or_else(|| {
            ServiceError::BadRequest("Channel name for project could not be found.".to_string())
        })?;

    let (window_start, window_end) = event_time_window(&query.0, Utc::now());

    let mut query_builder = events::table
        .filter(events::user_id.eq(caller))
        .filter(events::project_id.eq(project.id))
        .filter(events::channel_id.eq(channel.id))
        .into_boxed();

    if let Some(start) = window_start {
        query_builder = query_builder.filter(events::created_at.ge(start));
    }
    if let Some(end) = window_end {
        query_builder = query_builder.filter(events::created_at.le(end));
    }

    let event_list = query_builder
        .order(events::created_at.asc())
        .select(Event::as_select())
        .load::<Event>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    Ok(HttpResponse::Ok().json(event_list))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn both_bounds_pass_through() {
        let params = EventWindowParams {
            start: Some(at(2)),
            end: Some(at(5)),
        };
        assert_eq!(
            event_time_window(&params, at(12)),
            (Some(at(2)), Some(at(5)))
        );
    }

    #[test]
    fn missing_end_is_capped_at_request_time() {
        let params = EventWindowParams {
            start: Some(at(2)),
            end: None,
        };
        assert_eq!(
            event_time_window(&params, at(12)),
            (Some(at(2)), Some(at(12)))
        );
    }

    #[test]
    fn missing_start_leaves_lower_edge_open() {
        let params = EventWindowParams {
            start: None,
            end: Some(at(5)),
        };
        assert_eq!(event_time_window(&params, at(12)), (None, Some(at(5))));
    }

    #[test]
    fn no_bounds_means_unbounded() {
        let params = EventWindowParams::default();
        assert_eq!(event_time_window(&params, at(12)), (None, None));
    }
}
