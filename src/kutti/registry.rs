//! # Entity Registry
//!
//! One [`EntityDescriptor`] per entity kind holds everything the console
//! needs to know about it: who may do what, which columns the listing shows
//! for a given role, which fields the create and edit forms carry, and which
//! fields are translated. Callers resolve a descriptor once with
//! [`descriptor`] instead of matching on the entity kind everywhere.
//!
//! Create and edit share a single field list. [`FormMode::Edit`] relaxes the
//! password to optional and drops the confirmation field;
//! [`prepare_payload`] strips what the API must not receive.

use serde_json::Value;
use std::collections::HashMap;

use crate::client::{ListScope, Transport};
use crate::error::Result;
use crate::form::{FieldDescriptor, FieldType, OptionSource, SelectOption};
use crate::grid::{ColumnDescriptor, ColumnKind};
use crate::model::{display_value, field_text, EntityKind, Record, Role};
use crate::shell::role_label;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

const ALL: &[Role] = &[Role::Admin, Role::LocalReferent, Role::Sponsor];
const STAFF: &[Role] = &[Role::Admin, Role::LocalReferent];
const ADMIN: &[Role] = &[Role::Admin];

#[derive(Debug, Clone, Copy)]
pub struct Permissions {
    pub view: &'static [Role],
    pub create: &'static [Role],
    pub edit: &'static [Role],
    pub delete: &'static [Role],
}

impl Permissions {
    pub fn can_view(&self, role: Role) -> bool {
        self.view.contains(&role)
    }

    pub fn can_create(&self, role: Role) -> bool {
        self.create.contains(&role)
    }

    pub fn can_edit(&self, role: Role) -> bool {
        self.edit.contains(&role)
    }

    pub fn can_delete(&self, role: Role) -> bool {
        self.delete.contains(&role)
    }
}

pub struct EntityDescriptor {
    pub kind: EntityKind,
    pub permissions: Permissions,
    /// Fields served through the translation cache.
    pub translated_fields: &'static [&'static str],
    /// Fields of the detail view, in display order.
    pub detail_fields: &'static [&'static str],
    columns: fn(Role) -> Vec<ColumnDescriptor>,
    fields: fn(FormMode) -> Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    pub fn columns(&self, role: Role) -> Vec<ColumnDescriptor> {
        (self.columns)(role)
    }

    pub fn fields(&self, mode: FormMode) -> Vec<FieldDescriptor> {
        (self.fields)(mode)
    }

    pub fn is_translated(&self, field: &str) -> bool {
        self.translated_fields.contains(&field)
    }
}

static CHILDREN: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Children,
    permissions: Permissions {
        view: ALL,
        create: STAFF,
        edit: STAFF,
        delete: ADMIN,
    },
    translated_fields: &["name", "description"],
    detail_fields: &[
        "name",
        "gender",
        "birth",
        "age",
        "mission_name",
        "referent_username",
        "sponsor_username",
        "description",
    ],
    columns: children_columns,
    fields: children_fields,
};

static NEWS: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::News,
    permissions: Permissions {
        view: ALL,
        create: STAFF,
        edit: STAFF,
        delete: ADMIN,
    },
    translated_fields: &["title", "content"],
    detail_fields: &[
        "title",
        "date",
        "child_name",
        "mission_name",
        "referent_username",
        "content",
    ],
    columns: news_columns,
    fields: news_fields,
};

static MISSIONS: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Missions,
    permissions: Permissions {
        view: ALL,
        create: ADMIN,
        edit: ADMIN,
        delete: ADMIN,
    },
    translated_fields: &["description"],
    detail_fields: &["name", "location", "referent_username", "description"],
    columns: missions_columns,
    fields: missions_fields,
};

static USERS: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Users,
    permissions: Permissions {
        view: ADMIN,
        create: ADMIN,
        edit: ADMIN,
        delete: ADMIN,
    },
    translated_fields: &["bio"],
    detail_fields: &[
        "username",
        "full_name",
        "email",
        "phone",
        "role",
        "ui_language",
        "bio",
    ],
    columns: users_columns,
    fields: users_fields,
};

pub fn descriptor(kind: EntityKind) -> &'static EntityDescriptor {
    match kind {
        EntityKind::Children => &CHILDREN,
        EntityKind::News => &NEWS,
        EntityKind::Missions => &MISSIONS,
        EntityKind::Users => &USERS,
    }
}

// Cell renderers

fn render_gender(value: &Value, _row: &Record) -> String {
    match value.as_str() {
        Some("man") | Some("male") => "Man".to_string(),
        Some("woman") | Some("female") => "Woman".to_string(),
        _ => display_value(value),
    }
}

fn render_age(value: &Value, _row: &Record) -> String {
    match value.as_i64() {
        Some(1) => "1 year".to_string(),
        Some(n) => format!("{} years", n),
        None => display_value(value),
    }
}

fn render_sponsor(value: &Value, _row: &Record) -> String {
    match display_value(value) {
        s if s.is_empty() => "No sponsor".to_string(),
        s => s,
    }
}

fn render_date(value: &Value, _row: &Record) -> String {
    let text = display_value(value);
    match crate::dates::parse_datetime(&text) {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None if text.is_empty() => "-".to_string(),
        None => text,
    }
}

fn render_preview(value: &Value, _row: &Record) -> String {
    let text = display_value(value);
    if text.is_empty() {
        return "-".to_string();
    }
    if text.chars().count() > 100 {
        let cut: String = text.chars().take(100).collect();
        format!("{}...", cut)
    } else {
        text
    }
}

fn render_role(value: &Value, _row: &Record) -> String {
    match serde_json::from_value::<Role>(value.clone()) {
        Ok(role) => role_label(role).to_string(),
        Err(_) => display_value(value),
    }
}

fn children_columns(role: Role) -> Vec<ColumnDescriptor> {
    let mut columns = vec![
        ColumnDescriptor::new("name", "Name").sortable(),
        ColumnDescriptor::new("mission_name", "Mission")
            .sortable()
            .filterable(),
        ColumnDescriptor::new("referent_username", "Referent")
            .sortable()
            .filterable(),
    ];
    if matches!(role, Role::Admin | Role::LocalReferent) {
        columns.push(
            ColumnDescriptor::new("sponsor_username", "Sponsor")
                .sortable()
                .filterable()
                .render(render_sponsor),
        );
    }
    columns.extend([
        ColumnDescriptor::new("gender", "Gender")
            .sortable()
            .filterable()
            .render(render_gender),
        ColumnDescriptor::new("age", "Age")
            .sortable()
            .kind(ColumnKind::Number)
            .render(render_age),
        ColumnDescriptor::new("birth", "Birth Date")
            .sortable()
            .kind(ColumnKind::Date)
            .render(render_date),
    ]);
    columns
}

fn news_columns(role: Role) -> Vec<ColumnDescriptor> {
    let mut columns = vec![
        ColumnDescriptor::new("title", "Title").sortable(),
        ColumnDescriptor::new("child_name", "Child")
            .sortable()
            .filterable(),
        ColumnDescriptor::new("mission_name", "Mission")
            .sortable()
            .filterable(),
    ];
    if matches!(role, Role::Admin | Role::Sponsor) {
        columns.push(
            ColumnDescriptor::new("referent_username", "Referent")
                .sortable()
                .filterable(),
        );
    }
    columns.extend([
        ColumnDescriptor::new("date", "Date")
            .sortable()
            .kind(ColumnKind::Date)
            .render(render_date),
        ColumnDescriptor::new("content", "Content").render(render_preview),
    ]);
    columns
}

fn missions_columns(_role: Role) -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("name", "Name").sortable(),
        ColumnDescriptor::new("location", "Location")
            .sortable()
            .filterable(),
        ColumnDescriptor::new("referent_username", "Referent")
            .sortable()
            .filterable(),
        ColumnDescriptor::new("description", "Description").render(render_preview),
    ]
}

fn users_columns(_role: Role) -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("username", "Username")
            .sortable()
            .filterable(),
        ColumnDescriptor::new("full_name", "Full Name")
            .sortable()
            .filterable(),
        ColumnDescriptor::new("email", "Email")
            .sortable()
            .filterable(),
        ColumnDescriptor::new("role", "Role")
            .sortable()
            .filterable()
            .render(render_role),
        ColumnDescriptor::new("phone", "Phone")
            .sortable()
            .filterable(),
        ColumnDescriptor::new("bio", "Bio").render(render_preview),
    ]
}

fn gender_options() -> Vec<SelectOption> {
    vec![
        SelectOption::new("man", "Man"),
        SelectOption::new("woman", "Woman"),
    ]
}

fn role_options() -> Vec<SelectOption> {
    [Role::Admin, Role::LocalReferent, Role::Sponsor]
        .into_iter()
        .map(|r| SelectOption::new(r.as_str(), role_label(r)))
        .collect()
}

fn children_fields(_mode: FormMode) -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("name", "Name", FieldType::Text)
            .required()
            .placeholder("Enter child name..."),
        FieldDescriptor::new("gender", "Gender", FieldType::Select)
            .required()
            .options(gender_options())
            .placeholder("Select gender..."),
        FieldDescriptor::new("birth_date", "Birth Date", FieldType::Date).required(),
        FieldDescriptor::new("mission_id", "Mission", FieldType::Select)
            .required()
            .options_from(OptionSource::Missions)
            .placeholder("Select a mission..."),
        FieldDescriptor::new("sponsor_id", "Sponsor", FieldType::Select)
            .options_from(OptionSource::Sponsors)
            .placeholder("Select a sponsor..."),
        FieldDescriptor::new("media_files", "Photos & Videos", FieldType::Media).max_files(10),
        FieldDescriptor::new("description", "Description", FieldType::Textarea)
            .rows(4)
            .placeholder("Enter a brief description about the child..."),
    ]
}

fn news_fields(_mode: FormMode) -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("title", "Title", FieldType::Text)
            .required()
            .placeholder("Enter news title..."),
        FieldDescriptor::new("child_id", "Child", FieldType::Select)
            .required()
            .options_from(OptionSource::Children)
            .placeholder("Select a child..."),
        FieldDescriptor::new("date", "Date", FieldType::Date).required(),
        FieldDescriptor::new("content", "Content", FieldType::Textarea)
            .required()
            .rows(5)
            .placeholder("Enter news content..."),
        FieldDescriptor::new("media_files", "Photos & Videos", FieldType::Media).max_files(5),
    ]
}

fn missions_fields(_mode: FormMode) -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("name", "Name", FieldType::Text).required(),
        FieldDescriptor::new("description", "Description", FieldType::Textarea).rows(4),
        FieldDescriptor::new("location", "Location", FieldType::Text),
        FieldDescriptor::new("referent_id", "Referent", FieldType::Select)
            .options_from(OptionSource::Referents)
            .placeholder("Select a referent..."),
    ]
}

const PASSWORD_MISMATCH: &str = "Passwords do not match";

fn confirm_matches(value: &Value, values: &Record) -> Option<String> {
    let password = field_text(values, "password");
    (display_value(value) != password).then(|| PASSWORD_MISMATCH.to_string())
}

fn users_fields(mode: FormMode) -> Vec<FieldDescriptor> {
    let password = FieldDescriptor::new("password", "Password", FieldType::Password);
    let mut fields = vec![
        FieldDescriptor::new("username", "Username", FieldType::Text)
            .required()
            .placeholder("Enter username..."),
        FieldDescriptor::new("email", "Email", FieldType::Email)
            .required()
            .placeholder("Enter email address..."),
        FieldDescriptor::new("phone", "Phone", FieldType::Text),
    ];
    match mode {
        FormMode::Create => {
            fields.push(password.required());
            fields.push(
                FieldDescriptor::new("confirmPassword", "Confirm Password", FieldType::Password)
                    .required()
                    .validator(confirm_matches),
            );
        }
        FormMode::Edit => {
            fields.push(password.placeholder("Leave blank to keep the current password"));
        }
    }
    fields.extend([
        FieldDescriptor::new("full_name", "Full Name", FieldType::Text).required(),
        FieldDescriptor::new("role", "Role", FieldType::Select)
            .required()
            .options_from(OptionSource::Roles),
        FieldDescriptor::new("media_files", "Profile Pictures", FieldType::Media).max_files(3),
        FieldDescriptor::new("bio", "Biography", FieldType::Textarea).rows(3),
    ]);
    fields
}

fn is_referent(user: &Record) -> bool {
    matches!(
        user.get("role").and_then(Value::as_str),
        Some("referent" | "local_referent" | "localReferent")
    )
}

fn is_sponsor(user: &Record) -> bool {
    user.get("role").and_then(Value::as_str) == Some("sponsor")
}

fn option(record: &Record, label: String) -> SelectOption {
    SelectOption::new(field_text(record, "id"), label)
}

fn fetch_options<T: Transport + ?Sized>(
    source: OptionSource,
    transport: &T,
    scope: &ListScope,
) -> Result<Vec<SelectOption>> {
    let options = match source {
        OptionSource::Roles => role_options(),
        OptionSource::Children => transport
            .list(EntityKind::Children, scope)?
            .iter()
            .map(|c| option(c, field_text(c, "name")))
            .collect(),
        OptionSource::Missions => transport
            .list(EntityKind::Missions, scope)?
            .iter()
            .map(|m| option(m, field_text(m, "name")))
            .collect(),
        OptionSource::Referents => transport
            .list(EntityKind::Users, scope)?
            .iter()
            .filter(|u| is_referent(u))
            .map(|u| {
                let name = field_text(u, "username");
                let label = match field_text(u, "email") {
                    email if email.is_empty() => name,
                    email => format!("{} ({})", name, email),
                };
                option(u, label)
            })
            .collect(),
        OptionSource::Sponsors => transport
            .list(EntityKind::Users, scope)?
            .iter()
            .filter(|u| is_sponsor(u))
            .map(|u| {
                let label = match field_text(u, "full_name") {
                    full if full.trim().is_empty() => field_text(u, "username"),
                    full => full,
                };
                option(u, label)
            })
            .collect(),
    };
    Ok(options)
}

/// Fills the choices of every select field that loads them from the API.
/// Each source is fetched at most once.
pub fn load_options<T: Transport + ?Sized>(
    fields: &mut [FieldDescriptor],
    transport: &T,
    scope: &ListScope,
) -> Result<()> {
    let mut loaded: HashMap<OptionSource, Vec<SelectOption>> = HashMap::new();
    for field in fields.iter_mut() {
        let Some(source) = field.option_source else {
            continue;
        };
        if !loaded.contains_key(&source) {
            loaded.insert(source, fetch_options(source, transport, scope)?);
        }
        if let Some(options) = loaded.get(&source) {
            field.options = options.clone();
        }
    }
    Ok(())
}

/// What gets sent to the API for a submitted form.
///
/// Drops the password confirmation, drops a blank password when editing,
/// and turns numeric `*_id` selections into numbers.
pub fn prepare_payload(mode: FormMode, values: &Record) -> Record {
    let mut payload = values.clone();
    payload.remove("confirmPassword");
    if mode == FormMode::Edit
        && payload
            .get("password")
            .is_some_and(|p| display_value(p).trim().is_empty())
    {
        payload.remove("password");
    }
    for (key, value) in payload.iter_mut() {
        if !key.ends_with("_id") {
            continue;
        }
        if let Value::String(s) = value {
            if s.trim().is_empty() {
                *value = Value::Null;
            } else if let Ok(id) = s.trim().parse::<i64>() {
                *value = Value::from(id);
            }
        }
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::memory::InMemoryTransport;
    use crate::form::validate::validate;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().unwrap().clone()
    }

    fn keys(columns: &[ColumnDescriptor]) -> Vec<&str> {
        columns.iter().map(|c| c.key.as_str()).collect()
    }

    #[test]
    fn permission_matrix() {
        let children = descriptor(EntityKind::Children).permissions;
        assert!(children.can_edit(Role::LocalReferent));
        assert!(!children.can_delete(Role::LocalReferent));
        assert!(!children.can_create(Role::Sponsor));
        assert!(children.can_view(Role::Sponsor));

        let missions = descriptor(EntityKind::Missions).permissions;
        assert!(!missions.can_edit(Role::LocalReferent));
        assert!(missions.can_delete(Role::Admin));

        let users = descriptor(EntityKind::Users).permissions;
        assert!(!users.can_view(Role::LocalReferent));
    }

    #[test]
    fn sponsor_column_is_hidden_from_sponsors() {
        let d = descriptor(EntityKind::Children);
        assert!(keys(&d.columns(Role::Admin)).contains(&"sponsor_username"));
        assert!(keys(&d.columns(Role::LocalReferent)).contains(&"sponsor_username"));
        assert!(!keys(&d.columns(Role::Sponsor)).contains(&"sponsor_username"));
    }

    #[test]
    fn renderers_format_cells() {
        let d = descriptor(EntityKind::Children);
        let cols = d.columns(Role::Admin);
        let row = rec(json!({"gender": "woman", "age": 1, "sponsor_username": null, "birth": "2015-04-02"}));
        let cell = |key: &str| cols.iter().find(|c| c.key == key).unwrap().cell(&row);
        assert_eq!(cell("gender"), "Woman");
        assert_eq!(cell("age"), "1 year");
        assert_eq!(cell("sponsor_username"), "No sponsor");
        assert_eq!(cell("birth"), "2015-04-02");

        let users = descriptor(EntityKind::Users).columns(Role::Admin);
        let row = rec(json!({"role": "referent"}));
        let role = users.iter().find(|c| c.key == "role").unwrap();
        assert_eq!(role.cell(&row), "Local Referent");
    }

    #[test]
    fn edit_mode_relaxes_password() {
        let d = descriptor(EntityKind::Users);
        let create = d.fields(FormMode::Create);
        let edit = d.fields(FormMode::Edit);
        assert!(create.iter().any(|f| f.key == "confirmPassword"));
        assert!(!edit.iter().any(|f| f.key == "confirmPassword"));
        let pw = edit.iter().find(|f| f.key == "password").unwrap();
        assert!(!pw.required);
    }

    #[test]
    fn confirmation_must_match() {
        let fields = descriptor(EntityKind::Users).fields(FormMode::Create);
        let values = rec(json!({
            "username": "bo", "email": "bo@k.org", "full_name": "Bo",
            "role": "sponsor", "password": "one", "confirmPassword": "two"
        }));
        let errors = validate(&fields, &values);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["confirmPassword"], PASSWORD_MISMATCH);
    }

    #[test]
    fn payload_drops_confirmation_and_blank_edit_password() {
        let values = rec(json!({
            "password": "", "confirmPassword": "", "mission_id": "3", "sponsor_id": ""
        }));
        let edit = prepare_payload(FormMode::Edit, &values);
        assert!(edit.get("password").is_none());
        assert!(edit.get("confirmPassword").is_none());
        assert_eq!(edit["mission_id"], 3);
        assert_eq!(edit["sponsor_id"], Value::Null);

        let create = prepare_payload(FormMode::Create, &values);
        assert!(create.get("password").is_some());
    }

    #[test]
    fn options_load_once_per_source() {
        let t = InMemoryTransport::new()
            .with_user("rita", "pw", Role::LocalReferent)
            .with_user("sam", "pw", Role::Sponsor)
            .with_records(
                EntityKind::Missions,
                vec![rec(json!({"name": "Kerala"})), rec(json!({"name": "Goa"}))],
            );
        let mut fields = descriptor(EntityKind::Children).fields(FormMode::Create);
        load_options(&mut fields, &t, &ListScope::default()).unwrap();

        let missions = fields.iter().find(|f| f.key == "mission_id").unwrap();
        let labels: Vec<&str> = missions.options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["Kerala", "Goa"]);

        let sponsors = fields.iter().find(|f| f.key == "sponsor_id").unwrap();
        assert_eq!(sponsors.options.len(), 1);
        assert_eq!(sponsors.options[0].label, "sam");

        let mut mission_fields = descriptor(EntityKind::Missions).fields(FormMode::Create);
        load_options(&mut mission_fields, &t, &ListScope::default()).unwrap();
        let referents = mission_fields.iter().find(|f| f.key == "referent_id").unwrap();
        assert_eq!(referents.options[0].label, "rita");
    }

    #[test]
    fn translated_fields_per_entity() {
        assert!(descriptor(EntityKind::News).is_translated("content"));
        assert!(descriptor(EntityKind::Users).is_translated("bio"));
        assert!(!descriptor(EntityKind::Missions).is_translated("location"));
    }
}
