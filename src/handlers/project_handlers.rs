use crate::auth::AuthenticatedUser;
use crate::db::DbPool;
use crate::error::ServiceError;
use crate::models::{validate_name, CreateProjectPayload, NewProject, Project};
use crate::schema::projects::{self, dsl::*};
use actix_web::{get, post, web, HttpResponse};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

// === GET /project/ ===
#[get("")]
pub async fn list_projects_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ServiceError> {
    let caller = authenticated_user.id;

    let mut conn = pool.get().await?;

    let project_list = projects
        .filter(user_id.eq(caller))
        .order(created_at.asc())
        .select(Project::as_select())
        .load::<Project>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    Ok(HttpResponse::Ok().json(project_list))
}

// === POST /project/ ===
#[post("")]
pub async fn create_project_handler(
    pool: web::Data<DbPool>,
    authenticated_user: AuthenticatedUser,
    payload: web::Json<CreateProjectPayload>,
) -> Result<HttpResponse, ServiceError> {
    let caller = authenticated_user.id;
    log::info!("User {} creating project {:?}", caller, payload.name);

    validate_name("name", &payload.name)?;

    let mut conn = pool.get().await?;

    // Project names are unique per owner.
    let already_taken = projects
        .filter(user_id.eq(caller))
        .filter(name.eq(&payload.name))
        .count()
        .get_result::<i64>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    if already_taken > 0 {
        return Err(ServiceError::BadRequest(
            "Project name already exists for user.".to_string(),
        ));
    }

    let new_project_data = NewProject {
        user_id: caller,
        name: payload.name.clone(),
    };

    let project = diesel::insert_into(projects::table)
        .values(&new_project_data)
        .get_result::<Project>(&mut conn)
        .await
        .map_err(ServiceError::from)?;

    Ok(HttpResponse::Created().json(project))
}
