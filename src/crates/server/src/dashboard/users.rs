use crate::consts;
use crate::csrf::{CsrfForm, CsrfProtected, CsrfToken};
use crate::flash::{self, Flash};
use crate::middleware::CurrentUser;
use crate::render;
use crate::AppState;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use application::command::user::{CreateUserCmd, UpdateUserCmd};
use application::error::AppError;
use application::query::pagination::{ListParams, PaginatedResult, PaginationMeta};
use askama::Template;
use domain::user::{SortColumn, SortOrder, User, UserType};
use domain::value::UserId;
use log::{error, warn};
use serde::Deserialize;
use url::form_urlencoded;

const REQUIRED_ON_CREATE: &str = "Name, account, password and user type are required.";
const REQUIRED_ON_UPDATE: &str = "Name, account and user type are required.";
const INVALID_TYPE: &str = "Invalid user type selected.";

const SORTABLE: [(SortColumn, &str); 6] = [
    (SortColumn::Id, "ID"),
    (SortColumn::Name, "Name"),
    (SortColumn::Account, "Account"),
    (SortColumn::Status, "Status"),
    (SortColumn::Type, "Type"),
    (SortColumn::CreatedAt, "Created"),
];

/// List query string. Numbers are parsed leniently; garbage falls back to defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub sort_by: String,
    pub order_by: String,
    pub name: String,
}

impl ListQuery {
    fn parse(query_string: &str) -> Self {
        web::Query::<ListQuery>::from_query(query_string)
            .map(web::Query::into_inner)
            .unwrap_or_default()
    }

    fn into_params(self) -> ListParams {
        let number = |v: Option<String>| v.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(0);
        ListParams {
            page: number(self.page),
            per_page: number(self.per_page),
            sort_by: self.sort_by,
            order_by: self.order_by,
            name: self.name,
        }
        .normalized()
    }
}

pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub account: String,
    pub active: bool,
    pub user_type: &'static str,
    pub created_at: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.as_i64(),
            name: user.name.clone(),
            account: user.account.clone(),
            active: user.status,
            user_type: user.user_type.as_str(),
            created_at: user.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

pub struct SortLink {
    pub label: &'static str,
    pub href: String,
    pub indicator: &'static str,
}

#[derive(Template)]
#[template(path = "dashboard/users/list.html")]
pub struct UserListPage {
    pub flash: Option<Flash>,
    pub csrf_token: String,
    pub name: String,
    pub rows: Vec<UserRow>,
    pub headers: Vec<SortLink>,
    pub meta: PaginationMeta,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

fn list_href(params: &ListParams, page: u64, sort_by: &str, order_by: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("page", &page.to_string())
        .append_pair("per_page", &params.per_page.to_string())
        .append_pair("sort_by", sort_by)
        .append_pair("order_by", order_by)
        .append_pair("name", &params.name)
        .finish();
    format!("{}?{}", consts::USERS_PATH, query)
}

fn sort_headers(params: &ListParams) -> Vec<SortLink> {
    let current = SortColumn::from_param(&params.sort_by);
    let order = SortOrder::from_param(&params.order_by);
    SORTABLE
        .iter()
        .map(|&(column, label)| {
            let (next_order, indicator) = match (column == current, order) {
                (true, SortOrder::Asc) => (SortOrder::Desc, "▲"),
                (true, SortOrder::Desc) => (SortOrder::Asc, "▼"),
                (false, _) => (SortOrder::Asc, ""),
            };
            SortLink {
                label,
                href: list_href(params, 1, column.as_str(), next_order.as_str()),
                indicator,
            }
        })
        .collect()
}

pub async fn list(
    req: HttpRequest,
    state: web::Data<AppState>,
    csrf: CsrfToken,
) -> HttpResponse {
    let params = ListQuery::parse(req.query_string()).into_params();

    let (page, flash) = match state.users.list_paginated(params.clone()).await {
        Ok(page) => (page, flash::read(&req)),
        Err(e) => {
            warn!("user list rendered empty: {}", e);
            (
                PaginatedResult::empty(params.page as u64, params.per_page as u64),
                Some(Flash::error("Users could not be loaded.")),
            )
        }
    };

    let sort_by = SortColumn::from_param(&params.sort_by).as_str();
    let order_by = SortOrder::from_param(&params.order_by).as_str();
    let meta = page.meta;
    let prev_href = meta
        .has_prev()
        .then(|| list_href(&params, meta.current_page - 1, sort_by, order_by));
    let next_href = meta
        .has_next()
        .then(|| list_href(&params, meta.current_page + 1, sort_by, order_by));

    render::ok(
        &req,
        &UserListPage {
            flash,
            csrf_token: csrf.value().to_string(),
            name: params.name.clone(),
            rows: page.data.iter().map(UserRow::from).collect(),
            headers: sort_headers(&params),
            meta,
            prev_href,
            next_href,
        },
    )
}

/// Fields of the create and edit forms.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct UserForm {
    pub name: String,
    pub account: String,
    pub password: String,
    pub status: String,
    #[serde(rename = "type")]
    pub user_type: String,
    pub csrf_token: String,
}

impl CsrfProtected for UserForm {
    fn csrf_token(&self) -> &str {
        &self.csrf_token
    }
}

impl UserForm {
    fn active(&self) -> bool {
        matches!(self.status.trim(), "true" | "on" | "1")
    }

    fn missing_required(&self, password_required: bool) -> bool {
        self.name.trim().is_empty()
            || self.account.trim().is_empty()
            || self.user_type.trim().is_empty()
            || (password_required && self.password.is_empty())
    }

    fn parsed_type(&self) -> Option<UserType> {
        UserType::try_from(self.user_type.trim()).ok()
    }
}

impl From<&User> for UserForm {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            account: user.account.clone(),
            password: String::new(),
            status: user.status.to_string(),
            user_type: user.user_type.as_str().to_string(),
            csrf_token: String::new(),
        }
    }
}

#[derive(Template)]
#[template(path = "dashboard/users/form.html")]
pub struct UserFormPage {
    pub flash: Option<Flash>,
    pub csrf_token: String,
    pub title: &'static str,
    pub action: String,
    pub editing: bool,
    pub name: String,
    pub account: String,
    pub active: bool,
    pub user_type: String,
    pub errors: Vec<String>,
}

impl UserFormPage {
    fn create(csrf: &CsrfToken, form: &UserForm, errors: Vec<String>) -> Self {
        Self::build(csrf, form, errors, "Create user", consts::USERS_PATH.to_string(), false)
    }

    fn edit(csrf: &CsrfToken, id: UserId, form: &UserForm, errors: Vec<String>) -> Self {
        let action = format!("{}/{}", consts::USERS_PATH, id);
        Self::build(csrf, form, errors, "Edit user", action, true)
    }

    fn build(
        csrf: &CsrfToken,
        form: &UserForm,
        errors: Vec<String>,
        title: &'static str,
        action: String,
        editing: bool,
    ) -> Self {
        Self {
            flash: None,
            csrf_token: csrf.value().to_string(),
            title,
            action,
            editing,
            name: form.name.clone(),
            account: form.account.clone(),
            active: form.active(),
            user_type: form.user_type.clone(),
            errors,
        }
    }
}

fn form_page(req: &HttpRequest, status: StatusCode, mut page: UserFormPage) -> HttpResponse {
    page.flash = flash::read(req);
    render::page(req, status, &page)
}

fn back_to_list(status: StatusCode, flash: Flash) -> HttpResponse {
    flash::redirect(consts::USERS_PATH, status, Some(flash))
}

pub async fn create_form(req: HttpRequest, csrf: CsrfToken) -> HttpResponse {
    let blank = UserForm {
        status: "true".to_string(),
        user_type: UserType::Dashboard.as_str().to_string(),
        ..Default::default()
    };
    form_page(&req, StatusCode::OK, UserFormPage::create(&csrf, &blank, Vec::new()))
}

pub async fn create(
    req: HttpRequest,
    state: web::Data<AppState>,
    current: CurrentUser,
    csrf: CsrfToken,
    form: CsrfForm<UserForm>,
) -> HttpResponse {
    let form = form.into_inner();
    let invalid = |msg: &str| {
        form_page(
            &req,
            StatusCode::BAD_REQUEST,
            UserFormPage::create(&csrf, &form, vec![msg.to_string()]),
        )
    };

    if form.missing_required(true) {
        return invalid(REQUIRED_ON_CREATE);
    }
    let Some(user_type) = form.parsed_type() else {
        return invalid(INVALID_TYPE);
    };

    let cmd = CreateUserCmd {
        name: form.name.clone(),
        account: form.account.clone(),
        password: form.password.clone(),
        status: form.active(),
        user_type,
    };
    match state.users.create(current.0.id, cmd).await {
        Ok(_) => back_to_list(StatusCode::FOUND, Flash::success("User created.")),
        Err(AppError::Validation(msg)) | Err(AppError::Credential(msg)) => invalid(&msg),
        Err(e) => {
            error!("create user {} failed: {}", form.account, e);
            form_page(
                &req,
                StatusCode::INTERNAL_SERVER_ERROR,
                UserFormPage::create(&csrf, &form, vec!["User could not be saved.".to_string()]),
            )
        }
    }
}

fn parse_id(raw: &str) -> Option<UserId> {
    raw.parse::<UserId>().ok()
}

pub async fn edit_form(
    req: HttpRequest,
    state: web::Data<AppState>,
    csrf: CsrfToken,
    path: web::Path<String>,
) -> HttpResponse {
    let Some(id) = parse_id(&path) else {
        return back_to_list(StatusCode::SEE_OTHER, Flash::error("Invalid user id."));
    };
    match state.users.get_by_id(id).await {
        Ok(user) => form_page(
            &req,
            StatusCode::OK,
            UserFormPage::edit(&csrf, id, &UserForm::from(&user), Vec::new()),
        ),
        Err(AppError::NotFound(_)) => {
            back_to_list(StatusCode::SEE_OTHER, Flash::error("User not found."))
        }
        Err(e) => {
            error!("edit form for user {} unavailable: {}", id, e);
            back_to_list(StatusCode::SEE_OTHER, Flash::error("User could not be loaded."))
        }
    }
}

pub async fn update(
    req: HttpRequest,
    state: web::Data<AppState>,
    current: CurrentUser,
    csrf: CsrfToken,
    path: web::Path<String>,
    form: CsrfForm<UserForm>,
) -> HttpResponse {
    let Some(id) = parse_id(&path) else {
        return back_to_list(StatusCode::SEE_OTHER, Flash::error("Invalid user id."));
    };
    let form = form.into_inner();
    let invalid = |msg: &str| {
        form_page(
            &req,
            StatusCode::BAD_REQUEST,
            UserFormPage::edit(&csrf, id, &form, vec![msg.to_string()]),
        )
    };

    if form.missing_required(false) {
        return invalid(REQUIRED_ON_UPDATE);
    }
    let Some(user_type) = form.parsed_type() else {
        return invalid(INVALID_TYPE);
    };

    let cmd = UpdateUserCmd {
        name: form.name.clone(),
        account: form.account.clone(),
        password: Some(form.password.clone()).filter(|p| !p.is_empty()),
        status: form.active(),
        user_type,
    };
    match state.users.update(current.0.id, id, cmd).await {
        Ok(()) => back_to_list(StatusCode::FOUND, Flash::success("User updated.")),
        Err(AppError::NotFound(_)) => {
            back_to_list(StatusCode::SEE_OTHER, Flash::error("User not found."))
        }
        Err(AppError::Validation(msg)) | Err(AppError::Credential(msg)) => invalid(&msg),
        Err(e) => {
            error!("update user {} failed: {}", id, e);
            form_page(
                &req,
                StatusCode::INTERNAL_SERVER_ERROR,
                UserFormPage::edit(&csrf, id, &form, vec!["User could not be updated.".to_string()]),
            )
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteForm {
    pub csrf_token: String,
}

impl CsrfProtected for DeleteForm {
    fn csrf_token(&self) -> &str {
        &self.csrf_token
    }
}

pub async fn delete(
    state: web::Data<AppState>,
    current: CurrentUser,
    path: web::Path<String>,
    _form: CsrfForm<DeleteForm>,
) -> HttpResponse {
    let Some(id) = parse_id(&path) else {
        return back_to_list(StatusCode::SEE_OTHER, Flash::error("Invalid user id."));
    };
    let flash = match state.users.delete(current.0.id, id).await {
        Ok(()) => Flash::success("User deleted."),
        Err(AppError::NotFound(_)) => Flash::error("User not found."),
        Err(e) => {
            error!("delete user {} failed: {}", id, e);
            Flash::error("User could not be deleted.")
        }
    };
    back_to_list(StatusCode::SEE_OTHER, flash)
}
