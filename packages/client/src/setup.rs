//! Setup view: collect name, role and room before joining.

use rustyline::{DefaultEditor, error::ReadlineError};

use crate::{
    config::Identity,
    domain::validate,
    envelope::Role,
    error::{ClientError, ValidationError},
};

/// Validated join parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub username: String,
    pub role: Role,
    pub room_id: String,
}

/// Setup form state between prompts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupForm {
    pub username: Option<String>,
    pub role: Option<Role>,
    pub room_id: Option<String>,
    /// Name and role come from the signed-in account
    pub locked: bool,
}

impl SetupForm {
    pub fn new(identity: Identity, role_given: bool, room_id: Option<String>) -> Self {
        let role = (identity.locked || role_given).then_some(identity.role);
        Self {
            username: identity.username,
            role,
            room_id,
            locked: identity.locked,
        }
    }

    /// Check the form. Missing fields count as empty.
    pub fn submit(&self) -> Result<JoinRequest, ValidationError> {
        let username = self.username.as_deref().unwrap_or_default();
        let room_id = self.room_id.as_deref().unwrap_or_default();
        validate(username, room_id)?;

        Ok(JoinRequest {
            username: username.trim().to_string(),
            role: self.role.unwrap_or(Role::Customer),
            room_id: room_id.trim().to_string(),
        })
    }

    /// Clear the fields a rejection points at so they are asked again.
    ///
    /// Returns `false` when the offending field is locked and cannot be fixed.
    pub fn reject(&mut self, error: &ValidationError) -> bool {
        let is_blank = |field: &Option<String>| field.as_deref().is_none_or(|v| v.trim().is_empty());

        let username_bad = match error {
            ValidationError::MissingField => is_blank(&self.username),
            ValidationError::UsernameTooShort { .. } => true,
        };
        if is_blank(&self.room_id) {
            self.room_id = None;
        }

        if username_bad {
            if self.locked {
                return false;
            }
            self.username = None;
        }
        true
    }
}

/// Run the setup prompts until the form validates.
///
/// Returns `Ok(None)` if the user quits (Ctrl+C / Ctrl+D).
pub fn prompt_setup(mut form: SetupForm) -> Result<Option<JoinRequest>, ClientError> {
    let mut editor = DefaultEditor::new().map_err(|e| ClientError::Input(e.to_string()))?;

    loop {
        if form.username.is_none() {
            match read_field(&mut editor, "Name: ")? {
                Some(name) => form.username = Some(name),
                None => return Ok(None),
            }
        }

        while form.role.is_none() {
            match read_field(&mut editor, "Role [customer/admin] (customer): ")? {
                Some(text) if text.trim().is_empty() => form.role = Some(Role::Customer),
                Some(text) => match parse_role(&text) {
                    Some(role) => form.role = Some(role),
                    None => println!("Please enter customer or admin."),
                },
                None => return Ok(None),
            }
        }

        if form.room_id.is_none() {
            match read_field(&mut editor, "Room ID: ")? {
                Some(room_id) => form.room_id = Some(room_id),
                None => return Ok(None),
            }
        }

        match form.submit() {
            Ok(request) => return Ok(Some(request)),
            Err(e) => {
                println!("{}", e);
                if !form.reject(&e) {
                    return Err(e.into());
                }
            }
        }
    }
}

/// Strict role parsing for typed input; unknown text is not a role.
fn parse_role(text: &str) -> Option<Role> {
    <Role as clap::ValueEnum>::from_str(text.trim(), true).ok()
}

fn read_field(editor: &mut DefaultEditor, prompt: &str) -> Result<Option<String>, ClientError> {
    match editor.readline(prompt) {
        Ok(line) => Ok(Some(line)),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(e) => Err(ClientError::Input(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(username: Option<&str>, room_id: Option<&str>, locked: bool) -> SetupForm {
        SetupForm {
            username: username.map(str::to_string),
            role: Some(Role::Customer),
            room_id: room_id.map(str::to_string),
            locked,
        }
    }

    #[test]
    fn test_submit_trims_fields() {
        // テスト項目: 送信時に名前とルーム ID の空白が除去される
        // given (前提条件):
        let form = form(Some(" Alice "), Some(" room1 "), false);

        // when (操作):
        let request = form.submit().unwrap();

        // then (期待する結果):
        assert_eq!(
            request,
            JoinRequest {
                username: "Alice".to_string(),
                role: Role::Customer,
                room_id: "room1".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_room_is_asked_again() {
        // テスト項目: ルーム ID が未入力の場合、ルーム ID だけが再入力対象になる
        // given (前提条件):
        let mut form = form(Some("Alice"), Some(""), false);
        let error = form.submit().unwrap_err();

        // when (操作):
        let recoverable = form.reject(&error);

        // then (期待する結果):
        assert!(recoverable);
        assert_eq!(form.username.as_deref(), Some("Alice"));
        assert_eq!(form.room_id, None);
    }

    #[test]
    fn test_short_name_is_asked_again() {
        // テスト項目: 名前が短すぎる場合、名前が再入力対象になる
        // given (前提条件):
        let mut form = form(Some("A"), Some("room1"), false);
        let error = form.submit().unwrap_err();

        // when (操作):
        let recoverable = form.reject(&error);

        // then (期待する結果):
        assert!(recoverable);
        assert_eq!(form.username, None);
        assert_eq!(form.room_id.as_deref(), Some("room1"));
    }

    #[test]
    fn test_locked_short_name_cannot_be_fixed() {
        // テスト項目: 固定された名前が短すぎる場合は回復不能と判定される
        // given (前提条件):
        let mut form = form(Some("A"), Some("room1"), true);
        let error = form.submit().unwrap_err();

        // when (操作):
        let recoverable = form.reject(&error);

        // then (期待する結果):
        assert!(!recoverable);
    }

    #[test]
    fn test_typed_role_is_parsed_strictly() {
        // テスト項目: 入力されたロールは大文字小文字を問わず解析され、未知の値は拒否される
        // given (前提条件):
        let inputs = [" Admin ", "customer", "root"];

        // when (操作):
        let roles: Vec<_> = inputs.iter().map(|text| parse_role(text)).collect();

        // then (期待する結果):
        assert_eq!(roles, vec![Some(Role::Admin), Some(Role::Customer), None]);
    }

    #[test]
    fn test_new_form_asks_role_only_when_not_given() {
        // テスト項目: ロールが指定されていない場合のみロールを質問する
        // given (前提条件):
        let identity = Identity {
            username: Some("Alice".to_string()),
            role: Role::Customer,
            locked: false,
        };

        // when (操作):
        let open = SetupForm::new(identity.clone(), false, None);
        let given = SetupForm::new(identity, true, None);

        // then (期待する結果):
        assert_eq!(open.role, None);
        assert_eq!(given.role, Some(Role::Customer));
    }
}
