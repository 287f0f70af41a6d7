use ticketbook_core::{AuthState, Result};
use uuid::Uuid;

use crate::state::AppState;

pub fn login(state: &AppState, username: &str, password: &str) -> Result<String> {
    match state.auth.sign_in(username, password)? {
        Some(signed) => Ok(format!(
            "Signed in as {} ({})\nsession: {}\nexpires: {}",
            signed.principal.identity,
            signed.principal.role,
            signed.session_id,
            signed.expires_at.to_rfc3339()
        )),
        None => Ok("Invalid username or password".to_string()),
    }
}

pub fn whoami(state: &AppState, session: Option<Uuid>) -> Result<String> {
    match state.auth.current_user(session)? {
        AuthState::Authenticated(p) => Ok(format!("{} ({})", p.identity, p.role)),
        AuthState::Anonymous => Ok("anonymous".to_string()),
    }
}

pub fn logout(state: &AppState, session: Uuid) -> Result<String> {
    if state.auth.sign_out(session)? {
        Ok("Signed out".to_string())
    } else {
        Ok("No such session".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;

    fn session_id(output: &str) -> Uuid {
        output
            .lines()
            .find_map(|l| l.strip_prefix("session: "))
            .unwrap()
            .parse()
            .unwrap()
    }

    #[test]
    fn test_login_whoami_logout() {
        let state = test_state();

        let out = login(&state, "ADMIN", "admin-pw").unwrap();
        assert!(out.starts_with("Signed in as admin (Admin)"));
        let id = session_id(&out);

        assert_eq!(whoami(&state, Some(id)).unwrap(), "admin (Admin)");
        assert_eq!(logout(&state, id).unwrap(), "Signed out");
        assert_eq!(whoami(&state, Some(id)).unwrap(), "anonymous");
        assert_eq!(logout(&state, id).unwrap(), "No such session");
    }

    #[test]
    fn test_bad_login() {
        let state = test_state();
        assert_eq!(
            login(&state, "admin", "nope").unwrap(),
            "Invalid username or password"
        );
        assert_eq!(whoami(&state, None).unwrap(), "anonymous");
    }
}
