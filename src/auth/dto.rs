use serde::Deserialize;

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Self-service registration form.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// User row as returned by `sp_get_user_by_email`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub userid: i64,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub passwordhash: Option<String>,
}
