use actix_web::cookie::{time::Duration, Cookie, SameSite};

use crate::auth::token::{SessionTokens, TOKEN_TTL_HOURS};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

fn base(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .finish()
}

/// The two session cookies set at login.
pub fn session_cookies(tokens: &SessionTokens, secure: bool) -> [Cookie<'static>; 2] {
    let max_age = Duration::hours(TOKEN_TTL_HOURS);
    let mut access = base(ACCESS_COOKIE, tokens.access.clone(), secure);
    access.set_max_age(max_age);
    let mut refresh = base(REFRESH_COOKIE, tokens.refresh.clone(), secure);
    refresh.set_max_age(max_age);
    [access, refresh]
}

/// Expired copies of both session cookies, which make browsers drop them.
pub fn cleared_cookies(secure: bool) -> [Cookie<'static>; 2] {
    let mut access = base(ACCESS_COOKIE, String::new(), secure);
    access.make_removal();
    let mut refresh = base(REFRESH_COOKIE, String::new(), secure);
    refresh.make_removal();
    [access, refresh]
}
