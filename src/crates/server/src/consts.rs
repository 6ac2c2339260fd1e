use domain::user::UserType;

pub const SESSION_COOKIE: &str = "session_id";
pub const FLASH_COOKIE: &str = "flash";
pub const CSRF_COOKIE: &str = "csrf_";
pub const CSRF_FIELD: &str = "csrf_token";

pub const LOGIN_PATH: &str = "/auth/login";
pub const USERS_PATH: &str = "/dashboard/users";
pub const DASHBOARD_HOME_PATH: &str = "/dashboard/home";
pub const PANEL_HOME_PATH: &str = "/panel/home";

/// Where a user of the given type lands after authentication.
pub fn home_path(user_type: UserType) -> &'static str {
    match user_type {
        UserType::Dashboard => DASHBOARD_HOME_PATH,
        UserType::Panel => PANEL_HOME_PATH,
    }
}
