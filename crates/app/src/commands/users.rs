use ticketbook_core::{PageRequest, Result, Role};

use super::{page_footer, to_json};
use crate::cli::UserCommand;
use crate::state::AppState;

pub fn run(state: &AppState, command: UserCommand) -> Result<String> {
    match command {
        UserCommand::Register {
            username,
            password,
            role,
        } => {
            if state.credentials.register(&username, &password, role)? {
                Ok(format!("Registered {} ({})", username.to_lowercase(), role))
            } else {
                Ok(format!("Username {} is already taken", username))
            }
        }

        UserCommand::List {
            session,
            page,
            json,
        } => {
            state.auth.require_role(Some(session), Role::Admin)?;
            let request = PageRequest::from(page);
            let result = state.credentials.list_users(&request)?;

            if json {
                return to_json(&result);
            }

            let mut out: Vec<String> = result
                .items
                .iter()
                .map(|u| format!("{:<30} {}", u.username, u.role))
                .collect();
            out.push(page_footer(
                request.page,
                request.page_size,
                result.items.len(),
                result.total_count,
            ));
            Ok(out.join("\n"))
        }

        UserCommand::Delete { username, session } => {
            let admin = state.auth.require_role(Some(session), Role::Admin)?;
            if state.credentials.delete_user(&username)? {
                tracing::info!(by = %admin.identity, %username, "Account removed");
                Ok(format!("Deleted {}", username))
            } else {
                Ok(format!("No such user {}", username))
            }
        }

        UserCommand::SetRole {
            username,
            role,
            session,
        } => {
            state.auth.require_role(Some(session), Role::Admin)?;
            if state.credentials.update_role(&username, role)? {
                Ok(format!("{} is now {}", username, role))
            } else {
                Ok(format!("No such user {}", username))
            }
        }

        UserCommand::RequestReset { username } => {
            // Same answer either way so the command can't probe for accounts
            state.credentials.request_password_reset(&username)?;
            Ok("If the account exists, a reset link has been sent".to_string())
        }

        UserCommand::ResetPassword {
            username,
            token,
            password,
        } => {
            if state.credentials.reset_password(&username, &token, &password)? {
                Ok("Password updated".to_string())
            } else {
                Ok("Invalid or expired reset token".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::PageArgs;
    use crate::state::tests::test_state;
    use ticketbook_core::{Error, UserRepository};
    use uuid::Uuid;

    fn page_args() -> PageArgs {
        PageArgs {
            page: 1,
            page_size: 10,
            search: None,
            sort: None,
            desc: false,
        }
    }

    fn sign_in(state: &AppState, username: &str, password: &str) -> Uuid {
        state
            .auth
            .sign_in(username, password)
            .unwrap()
            .unwrap()
            .session_id
    }

    fn register(state: &AppState, username: &str) -> String {
        run(
            state,
            UserCommand::Register {
                username: username.to_string(),
                password: "pw-123".to_string(),
                role: Role::User,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_register_and_duplicate() {
        let state = test_state();
        assert_eq!(register(&state, "Alice"), "Registered alice (User)");
        assert_eq!(register(&state, "alice"), "Username alice is already taken");
    }

    #[test]
    fn test_list_requires_admin() {
        let state = test_state();
        register(&state, "bob");
        let user_session = sign_in(&state, "bob", "pw-123");
        let admin_session = sign_in(&state, "admin", "admin-pw");

        let denied = run(
            &state,
            UserCommand::List {
                session: user_session,
                page: page_args(),
                json: false,
            },
        );
        assert!(matches!(denied, Err(Error::PermissionDenied(_))));

        let out = run(
            &state,
            UserCommand::List {
                session: admin_session,
                page: page_args(),
                json: false,
            },
        )
        .unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("admin"));
        assert!(lines[1].starts_with("bob"));
        assert_eq!(lines[2], "page 1 (2 shown, 2 total, page size 10)");
    }

    #[test]
    fn test_list_json() {
        let state = test_state();
        let admin_session = sign_in(&state, "admin", "admin-pw");
        let out = run(
            &state,
            UserCommand::List {
                session: admin_session,
                page: page_args(),
                json: true,
            },
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["total_count"], 1);
        assert_eq!(value["items"][0]["username"], "admin");
    }

    #[test]
    fn test_set_role_and_delete() {
        let state = test_state();
        register(&state, "cara");
        let admin_session = sign_in(&state, "admin", "admin-pw");

        let out = run(
            &state,
            UserCommand::SetRole {
                username: "cara".to_string(),
                role: Role::Admin,
                session: admin_session,
            },
        )
        .unwrap();
        assert_eq!(out, "cara is now Admin");

        let out = run(
            &state,
            UserCommand::Delete {
                username: "cara".to_string(),
                session: admin_session,
            },
        )
        .unwrap();
        assert_eq!(out, "Deleted cara");
        assert!(state.credentials.get_user("cara").unwrap().is_none());
    }

    #[test]
    fn test_reset_flow() {
        let state = test_state();
        register(&state, "dan");

        let out = run(
            &state,
            UserCommand::RequestReset {
                username: "dan".to_string(),
            },
        )
        .unwrap();
        assert!(out.starts_with("If the account exists"));

        let token = state
            .store
            .find_user_by_username("dan")
            .unwrap()
            .unwrap()
            .reset_token
            .unwrap();

        let reset = |token: &str| {
            run(
                &state,
                UserCommand::ResetPassword {
                    username: "dan".to_string(),
                    token: token.to_string(),
                    password: "new-pw".to_string(),
                },
            )
            .unwrap()
        };

        assert_eq!(reset("bogus"), "Invalid or expired reset token");
        assert_eq!(reset(&token), "Password updated");
        assert_eq!(reset(&token), "Invalid or expired reset token");
        assert!(state.auth.sign_in("dan", "new-pw").unwrap().is_some());
    }
}
