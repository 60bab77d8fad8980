use std::convert::Infallible;

use serde::{Deserialize, Serialize};
use serde_json::json;
use warp::{
    body::BodyDeserializeError,
    hyper::StatusCode,
    path,
    reject::InvalidQuery,
    Filter, Rejection, Reply,
};

use crate::{
    auth::Auth,
    error::ApiError,
    fleet::Fleet,
    gate::{with_auth_state, with_roles, ADM, ADM_OR_EDITOR},
    types::{
        AdminID, AuthenticatedUser, CredentialRecord, Identifier, Pagination, Role,
        VehicleDetails, VehicleFilter, VehicleID,
    },
};

const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Every endpoint of the service, without error recovery.
pub fn build_api_route_filter(
    auth: &Auth,
    fleet: &Fleet,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let home = warp::path::end().and(warp::get()).map(home);

    home.or(admin_routes(auth)).or(vehicle_routes(auth, fleet))
}

pub fn admin_routes(auth: &Auth) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let login = path!("administradores" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_auth_state(auth.clone()))
        .and_then(admin_login);

    let list = path!("administradores")
        .and(warp::get())
        .and(with_roles(auth, ADM))
        .and(warp::query::<Pagination>())
        .and(with_auth_state(auth.clone()))
        .and_then(admin_list);

    let get = path!("administradores" / u64)
        .and(warp::get())
        .and(with_roles(auth, ADM))
        .and(with_auth_state(auth.clone()))
        .and_then(admin_get);

    let create = path!("administradores")
        .and(warp::post())
        .and(with_roles(auth, ADM))
        .and(json_body())
        .and(with_auth_state(auth.clone()))
        .and_then(admin_create);

    login.or(list).or(get).or(create)
}

pub fn vehicle_routes(
    auth: &Auth,
    fleet: &Fleet,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list = path!("veiculos")
        .and(warp::get())
        .and(with_roles(auth, ADM_OR_EDITOR))
        .and(warp::query::<VehicleQuery>())
        .and(with_fleet(fleet.clone()))
        .and_then(vehicle_list);

    let get = path!("veiculos" / u64)
        .and(warp::get())
        .and(with_roles(auth, ADM_OR_EDITOR))
        .and(with_fleet(fleet.clone()))
        .and_then(vehicle_get);

    let create = path!("veiculos")
        .and(warp::post())
        .and(with_roles(auth, ADM_OR_EDITOR))
        .and(json_body())
        .and(with_fleet(fleet.clone()))
        .and_then(vehicle_create);

    let update = path!("veiculos" / u64)
        .and(warp::put())
        .and(with_roles(auth, ADM))
        .and(json_body())
        .and(with_fleet(fleet.clone()))
        .and_then(vehicle_update);

    let delete = path!("veiculos" / u64)
        .and(warp::delete())
        .and(with_roles(auth, ADM))
        .and(with_fleet(fleet.clone()))
        .and_then(vehicle_delete);

    list.or(get).or(create).or(update).or(delete)
}

/// Turn rejections into status codes. Authentication failures (401) and
/// authorization failures (403) are kept apart.
pub async fn handle_api_errors(err: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(api_error) = err.find::<ApiError>() {
        let reply = match api_error {
            ApiError::Validation(messages) => warp::reply::with_status(
                warp::reply::json(&json!({ "messages": messages })),
                StatusCode::BAD_REQUEST,
            ),
            ApiError::NotFound => error_reply(StatusCode::NOT_FOUND, "not found"),
            ApiError::Forbidden(_) => error_reply(StatusCode::FORBIDDEN, "access denied"),
            ApiError::LoginFailed => {
                error_reply(StatusCode::UNAUTHORIZED, "email or password incorrect")
            }
            err if err.is_unauthenticated() => {
                return Ok(warp::reply::with_header(
                    error_reply(StatusCode::UNAUTHORIZED, "authentication required"),
                    "www-authenticate",
                    "Bearer",
                )
                .into_response());
            }
            err => {
                tracing::error!(error = %err, source = ?std::error::Error::source(err), "request failed");
                error_reply(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "an unknown error has occurred",
                )
            }
        };
        return Ok(reply.into_response());
    }

    if let Some(body_error) = err.find::<BodyDeserializeError>() {
        return Ok(error_reply(StatusCode::BAD_REQUEST, &body_error.to_string()).into_response());
    }

    if err.find::<InvalidQuery>().is_some() {
        return Ok(error_reply(StatusCode::BAD_REQUEST, "invalid query string").into_response());
    }

    Err(err)
}

#[derive(Debug, Serialize)]
struct HomeResponse {
    title: &'static str,
    message: &'static str,
    version: &'static str,
}

fn home() -> impl Reply {
    warp::reply::json(&HomeResponse {
        title: "Vehicle fleet management API",
        message: "Log in at POST /administradores/login and send the token as a bearer credential.",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub email: String,
    pub role: Role,
    pub token: String,
}

async fn admin_login(input: LoginQuery, auth: Auth) -> Result<impl Reply, Rejection> {
    let record = auth
        .verify_credentials(&Identifier(input.email), &input.password)
        .await?;

    let token = auth.issue_token(&record.identifier, record.role)?;

    Ok(warp::reply::json(&LoginResponse {
        email: record.identifier.0,
        role: record.role,
        token,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminView {
    pub id: AdminID,
    pub email: String,
    pub role: Role,
}

impl From<CredentialRecord> for AdminView {
    fn from(record: CredentialRecord) -> Self {
        Self {
            id: record.id,
            email: record.identifier.0,
            role: record.role,
        }
    }
}

async fn admin_list(
    _user: AuthenticatedUser,
    pagination: Pagination,
    auth: Auth,
) -> Result<impl Reply, Rejection> {
    let admins: Vec<AdminView> = auth
        .list_credentials(pagination)
        .await?
        .into_iter()
        .map(AdminView::from)
        .collect();

    Ok(warp::reply::json(&admins))
}

async fn admin_get(id: u64, _user: AuthenticatedUser, auth: Auth) -> Result<impl Reply, Rejection> {
    let record = auth.find_credential(AdminID(id)).await?;

    Ok(warp::reply::json(&AdminView::from(record)))
}

#[derive(Debug, Deserialize)]
pub struct CreateAdminQuery {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<Role>,
}

async fn admin_create(
    user: AuthenticatedUser,
    input: CreateAdminQuery,
    auth: Auth,
) -> Result<impl Reply, Rejection> {
    let mut messages = Vec::new();
    if input.email.trim().is_empty() {
        messages.push("email must not be empty".to_string());
    }
    if input.password.is_empty() {
        messages.push("password must not be empty".to_string());
    }
    if !messages.is_empty() {
        return Err(ApiError::Validation(messages).into());
    }

    let record = auth
        .create_credential(
            Identifier(input.email),
            &input.password,
            input.role.unwrap_or(Role::Editor),
        )
        .await?;
    tracing::debug!(created_by = %user.subject.0, id = record.id.0, "administrator provisioned");

    Ok(created(
        format!("/administradores/{}", record.id.0),
        &AdminView::from(record),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct VehicleQuery {
    pub page: Option<u32>,
    pub name: Option<String>,
    pub brand: Option<String>,
}

async fn vehicle_list(
    _user: AuthenticatedUser,
    query: VehicleQuery,
    fleet: Fleet,
) -> Result<impl Reply, Rejection> {
    let filter = VehicleFilter {
        name: query.name,
        brand: query.brand,
    };
    let vehicles = fleet.list(&filter, Pagination { page: query.page }).await?;

    Ok(warp::reply::json(&vehicles))
}

async fn vehicle_get(id: u64, _user: AuthenticatedUser, fleet: Fleet) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&fleet.get(VehicleID(id)).await?))
}

async fn vehicle_create(
    _user: AuthenticatedUser,
    details: VehicleDetails,
    fleet: Fleet,
) -> Result<impl Reply, Rejection> {
    let vehicle = fleet.create(details).await?;

    Ok(created(format!("/veiculos/{}", vehicle.id.0), &vehicle))
}

async fn vehicle_update(
    id: u64,
    _user: AuthenticatedUser,
    details: VehicleDetails,
    fleet: Fleet,
) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&fleet.update(VehicleID(id), details).await?))
}

async fn vehicle_delete(
    id: u64,
    _user: AuthenticatedUser,
    fleet: Fleet,
) -> Result<impl Reply, Rejection> {
    fleet.delete(VehicleID(id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

fn created(location: String, body: &impl Serialize) -> impl Reply {
    warp::reply::with_header(
        warp::reply::with_status(warp::reply::json(body), StatusCode::CREATED),
        "location",
        location,
    )
}

fn error_reply(status: StatusCode, message: &str) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&json!({ "error": message })), status)
}

fn json_body<T: serde::de::DeserializeOwned + Send>(
) -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

// functor that adds the vehicle service into the filter chain
fn with_fleet(fleet: Fleet) -> impl Filter<Extract = (Fleet,), Error = Infallible> + Clone {
    warp::any().map(move || fleet.clone())
}
