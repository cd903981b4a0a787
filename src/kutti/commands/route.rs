use crate::commands::{CmdMessage, CmdResult, RouteReport};
use crate::error::Result;
use crate::session::SessionContext;
use crate::shell::{guard, nav_items, Route, RouteDecision};
use crate::store::SessionStore;

/// Resolves `path` the way the console's router would for the current
/// session, along with the navigation the user would see.
pub fn run<S: SessionStore>(session: &SessionContext<S>, path: &str) -> Result<CmdResult> {
    let route = Route::parse(path);
    let decision = guard(&route, session);

    let mut result = CmdResult::default();
    if let Route::NotFound(missing) = &route {
        result.add_message(CmdMessage::warning(format!("No page at {}", missing)));
    } else if decision != RouteDecision::Render {
        result.add_message(CmdMessage::info(format!(
            "{}: {}",
            route,
            decision.describe()
        )));
    }

    Ok(result.with_route(RouteReport {
        route: route.path(),
        decision,
        nav: nav_items(session.role()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::helpers::fixtures::{signed_in, signed_out};
    use crate::model::Role;
    use crate::store::memory::InMemorySessionStore;

    fn decision(result: &CmdResult) -> RouteDecision {
        result.route.as_ref().unwrap().decision
    }

    #[test]
    fn signed_out_users_go_to_login() {
        let result = run(&signed_out(), "/children/3").unwrap();
        assert_eq!(decision(&result), RouteDecision::RedirectLogin);
        assert_eq!(result.route.unwrap().nav.len(), 2);
    }

    #[test]
    fn users_section_is_admin_only() {
        let sponsor = run(&signed_in(Role::Sponsor), "/users").unwrap();
        assert_eq!(decision(&sponsor), RouteDecision::RedirectHome);
        assert_eq!(sponsor.messages[0].content, "/users: redirect to /");

        let admin = run(&signed_in(Role::Admin), "/users").unwrap();
        assert_eq!(decision(&admin), RouteDecision::Render);
        assert!(admin.messages.is_empty());
        assert!(admin.route.unwrap().nav.iter().any(|n| n.path == "/users"));
    }

    #[test]
    fn waits_for_the_session_to_load() {
        let ctx = SessionContext::new(InMemorySessionStore::new());
        let result = run(&ctx, "/news").unwrap();
        assert_eq!(decision(&result), RouteDecision::Loading);
    }

    #[test]
    fn unknown_pages_render_not_found() {
        let result = run(&signed_in(Role::Admin), "/nowhere").unwrap();
        assert_eq!(decision(&result), RouteDecision::Render);
        assert_eq!(result.messages[0].content, "No page at /nowhere");
    }
}
