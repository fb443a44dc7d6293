use crate::auth::AuthenticatedUser;
use crate::db::DbPool;
use crate::error::ServiceError;
use crate::models::{validate_name, Channel, CreateChannelPayload, NewChannel};
use crate::schema::{channels, projects};
use actix_web::{get, post, web, HttpResponse};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

// === GET /channel/ ===
#[get("")]
pub async fn list_channels_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let caller = authenticated_user.id;

    let mut conn = pool.get().await?;

    let channel_list = channels::table
        .filter(channels::user_id.eq(caller))
        .order(channels::created_at.asc())
        .select(Channel::as_select())
        .load::<Channel>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    Ok(HttpResponse::Ok().json(channel_list))
}

// === POST /channel/ ===
#[post("")]
pub async fn create_channel_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    payload: web::Json<CreateChannelPayload>,
) -> Result<HttpResponse, ServiceError> {
    let caller = authenticated_user.id;
    log::info!(
        "User {} creating channel {:?} in project {}",
        caller,
        payload.name,
        payload.project_id
    );

    validate_name("name", &payload.name)?;

    let mut conn = pool.get().await?;

    // The referenced project must belong to the caller.
    let project_exists = projects::table
        .filter(projects::user_id.eq(caller))
        .filter(projects::id.eq(payload.project_id))
        .count()
        .get_result::<i64>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    if project_exists == 0 {
        return Err(ServiceError::BadRequest(
            "Project does not exist for user.".to_string(),
        ));
    }

    // Channel names are unique per owner within a project.
    let already_taken = channels::table
        .filter(channels::user_id.eq(caller))
        .filter(channels::project_id.eq(payload.project_id))
        .filter(channels::name.eq(&payload.name))
        .count()
        .get_result::<i64>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    if already_taken > 0 {
        return Err(ServiceError::BadRequest(
            "Channel name already exists for project.".to_string(),
        ));
    }

    let new_channel_data = NewChannel {
        user_id: caller,
        project_id: payload.project_id,
        name: payload.name.clone(),
    };

    let channel = diesel::insert_into(channels::table)
        .values(&new_channel_data)
        .get_result::<Channel>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    Ok(HttpResponse::Created().json(channel))
}
