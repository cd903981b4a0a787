use crate::client::Transport;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{KuttiError, Result};
use crate::session::SessionContext;
use crate::shell::role_label;
use crate::store::SessionStore;

pub fn login<T: Transport + ?Sized, S: SessionStore>(
    transport: &T,
    session: &mut SessionContext<S>,
    username: &str,
    password: &str,
) -> Result<CmdResult> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(KuttiError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let user = transport.login(username, password)?;
    let started = session.sign_in(user)?.clone();

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Signed in as {} ({})",
        started.user.display_name(),
        role_label(started.role())
    )));
    Ok(result.with_session(started))
}

pub fn logout<S: SessionStore>(session: &mut SessionContext<S>) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    match session.sign_out()? {
        Some(previous) => result.add_message(CmdMessage::success(format!(
            "Signed out {}",
            previous.user.username
        ))),
        None => result.add_message(CmdMessage::info("Not signed in.")),
    }
    Ok(result)
}

pub fn whoami<S: SessionStore>(session: &SessionContext<S>) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    match session.current() {
        Some(current) => Ok(result.with_session(current.clone())),
        None => {
            result.add_message(CmdMessage::info("Not signed in."));
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::helpers::fixtures::{signed_out, transport};
    use crate::model::Role;

    #[test]
    fn login_persists_the_session() {
        let t = transport();
        let mut ctx = signed_out();
        let result = login(&t, &mut ctx, "rita", "secret").unwrap();
        assert_eq!(result.session.unwrap().role(), Role::LocalReferent);
        assert_eq!(ctx.role(), Some(Role::LocalReferent));
        assert!(ctx.store().raw().is_some());
        assert!(result.messages[0].content.contains("Local Referent"));
    }

    #[test]
    fn wrong_password_leaves_the_user_signed_out() {
        let t = transport();
        let mut ctx = signed_out();
        let err = login(&t, &mut ctx, "rita", "nope").unwrap_err();
        assert!(matches!(err, KuttiError::Auth(_)));
        assert!(ctx.current().is_none());
    }

    #[test]
    fn blank_credentials_never_reach_the_server() {
        let t = transport();
        t.set_offline(true).unwrap();
        let mut ctx = signed_out();
        assert!(matches!(
            login(&t, &mut ctx, " ", "x"),
            Err(KuttiError::Validation(_))
        ));
    }

    #[test]
    fn logout_then_whoami() {
        let t = transport();
        let mut ctx = signed_out();
        login(&t, &mut ctx, "ada", "secret").unwrap();
        assert_eq!(whoami(&ctx).unwrap().session.unwrap().user.username, "ada");

        let out = logout(&mut ctx).unwrap();
        assert_eq!(out.messages[0].content, "Signed out ada");
        assert!(whoami(&ctx).unwrap().session.is_none());
        assert_eq!(logout(&mut ctx).unwrap().messages[0].content, "Not signed in.");
    }
}
