//! Page and form handlers.

pub mod groups;
pub mod users;

use dirwarden_directory::User;

/// One user as the templates render it. `id_segment` is the
/// percent-encoded form for use inside URL paths (relative DNs contain
/// commas, equals signs and spaces).
pub struct UserRow {
    pub id: String,
    pub id_segment: String,
    pub employee_number: u32,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub title: String,
    pub department: String,
    pub unit: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        let id = user.id.to_string();
        Self {
            id_segment: encode_segment(&id),
            id,
            employee_number: user.employee_number,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            title: user.title.clone(),
            department: user.department.clone(),
            unit: user.unit.clone(),
        }
    }
}

/// One group name plus its URL-safe path segment.
pub struct GroupRow {
    pub name: String,
    pub name_segment: String,
}

impl GroupRow {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name_segment: encode_segment(&name),
            name,
        }
    }
}

/// Percent-encode a value for use as a single URL path segment.
pub(crate) fn encode_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(b as char);
            }
            b => {
                out.push('%');
                out.push_str(&format!("{b:02X}"));
            }
        }
    }
    out
}
