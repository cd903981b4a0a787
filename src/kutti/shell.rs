//! # Shell
//!
//! Routing and role gating for the console's sections.
//!
//! Every section except home and login requires a session; the user
//! management section additionally requires an administrator. Before the
//! session has been read from storage, protected routes report
//! [`RouteDecision::Loading`] rather than bouncing the user to the login page.

use serde::Serialize;
use std::fmt;

use crate::model::{EntityKind, RecordId, Role};
use crate::session::SessionContext;
use crate::store::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Missions,
    Mission(RecordId),
    News,
    NewsItem(RecordId),
    Children,
    Child(RecordId),
    Users,
    NotFound(String),
}

impl Route {
    pub fn parse(path: &str) -> Route {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Home,
            ["login"] => Route::Login,
            ["missions"] => Route::Missions,
            ["news"] => Route::News,
            ["children"] => Route::Children,
            ["users"] => Route::Users,
            ["missions", raw] => parse_id(raw).map_or_else(|| not_found(path), Route::Mission),
            ["news", raw] => parse_id(raw).map_or_else(|| not_found(path), Route::NewsItem),
            ["children", raw] => parse_id(raw).map_or_else(|| not_found(path), Route::Child),
            _ => not_found(path),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Missions => "/missions".to_string(),
            Route::Mission(id) => format!("/missions/{}", id),
            Route::News => "/news".to_string(),
            Route::NewsItem(id) => format!("/news/{}", id),
            Route::Children => "/children".to_string(),
            Route::Child(id) => format!("/children/{}", id),
            Route::Users => "/users".to_string(),
            Route::NotFound(path) => path.clone(),
        }
    }

    /// The entity a section lists or shows.
    pub fn entity(&self) -> Option<EntityKind> {
        match self {
            Route::Missions | Route::Mission(_) => Some(EntityKind::Missions),
            Route::News | Route::NewsItem(_) => Some(EntityKind::News),
            Route::Children | Route::Child(_) => Some(EntityKind::Children),
            Route::Users => Some(EntityKind::Users),
            _ => None,
        }
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Home | Route::Login | Route::NotFound(_))
    }

    pub fn required_role(&self) -> Option<Role> {
        match self {
            Route::Users => Some(Role::Admin),
            _ => None,
        }
    }
}

fn parse_id(raw: &str) -> Option<RecordId> {
    raw.parse().ok()
}

fn not_found(path: &str) -> Route {
    Route::NotFound(path.to_string())
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDecision {
    Render,
    Loading,
    RedirectLogin,
    RedirectHome,
}

impl RouteDecision {
    pub fn describe(&self) -> &'static str {
        match self {
            RouteDecision::Render => "render",
            RouteDecision::Loading => "loading",
            RouteDecision::RedirectLogin => "redirect to /login",
            RouteDecision::RedirectHome => "redirect to /",
        }
    }
}

pub fn decide(route: &Route, initialized: bool, role: Option<Role>) -> RouteDecision {
    if !route.is_protected() {
        return RouteDecision::Render;
    }
    if !initialized {
        return RouteDecision::Loading;
    }
    let Some(role) = role else {
        return RouteDecision::RedirectLogin;
    };
    match route.required_role() {
        Some(required) if required != role => RouteDecision::RedirectHome,
        _ => RouteDecision::Render,
    }
}

pub fn guard<S: SessionStore>(route: &Route, session: &SessionContext<S>) -> RouteDecision {
    decide(route, session.is_initialized(), session.role())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
}

const fn nav(label: &'static str, path: &'static str) -> NavItem {
    NavItem { label, path }
}

/// Sections shown in the navigation for a role; signed-out users get sign in.
pub fn nav_items(role: Option<Role>) -> Vec<NavItem> {
    let mut items = vec![nav("Home", "/")];
    match role {
        None => items.push(nav("Sign in", "/login")),
        Some(role) => {
            items.push(nav("Missions", "/missions"));
            items.push(nav("News", "/news"));
            items.push(nav("Children", "/children"));
            if role == Role::Admin {
                items.push(nav("Users", "/users"));
            }
        }
    }
    items
}

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::Admin => "Administrator",
        Role::LocalReferent => "Local Referent",
        Role::Sponsor => "Sponsor",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemorySessionStore;
    use serde_json::json;

    #[test]
    fn parses_known_paths() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/children/"), Route::Children);
        assert_eq!(Route::parse("/news/12"), Route::NewsItem(12));
        assert_eq!(Route::parse("/missions/3"), Route::Mission(3));
        assert_eq!(
            Route::parse("/news/abc"),
            Route::NotFound("/news/abc".to_string())
        );
        assert_eq!(
            Route::parse("/enhanced-children"),
            Route::NotFound("/enhanced-children".to_string())
        );
    }

    #[test]
    fn path_round_trips() {
        for path in ["/", "/login", "/missions/4", "/news", "/children/9", "/users"] {
            assert_eq!(Route::parse(path).path(), path);
        }
    }

    #[test]
    fn protected_routes_wait_for_bootstrap() {
        assert_eq!(decide(&Route::News, false, None), RouteDecision::Loading);
        assert_eq!(decide(&Route::Login, false, None), RouteDecision::Render);
    }

    #[test]
    fn signed_out_users_go_to_login() {
        assert_eq!(
            decide(&Route::Child(1), true, None),
            RouteDecision::RedirectLogin
        );
        assert_eq!(decide(&Route::Home, true, None), RouteDecision::Render);
    }

    #[test]
    fn users_section_is_admin_only() {
        assert_eq!(
            decide(&Route::Users, true, Some(Role::LocalReferent)),
            RouteDecision::RedirectHome
        );
        assert_eq!(
            decide(&Route::Users, true, Some(Role::Admin)),
            RouteDecision::Render
        );
        assert_eq!(
            decide(&Route::Children, true, Some(Role::Sponsor)),
            RouteDecision::Render
        );
    }

    #[test]
    fn guard_reads_the_session_context() {
        let mut ctx = SessionContext::new(InMemorySessionStore::new());
        assert_eq!(guard(&Route::Missions, &ctx), RouteDecision::Loading);
        ctx.bootstrap().unwrap();
        assert_eq!(guard(&Route::Missions, &ctx), RouteDecision::RedirectLogin);
        let user = serde_json::from_value(json!({"id": 2, "username": "s", "role": "sponsor"}))
            .unwrap();
        ctx.sign_in(user).unwrap();
        assert_eq!(guard(&Route::Missions, &ctx), RouteDecision::Render);
        assert_eq!(guard(&Route::Users, &ctx), RouteDecision::RedirectHome);
    }

    #[test]
    fn nav_depends_on_role() {
        let paths = |role| {
            nav_items(role)
                .into_iter()
                .map(|i| i.path)
                .collect::<Vec<_>>()
        };
        assert_eq!(paths(None), vec!["/", "/login"]);
        assert!(!paths(Some(Role::Sponsor)).contains(&"/users"));
        assert!(paths(Some(Role::Admin)).contains(&"/users"));
    }
}
