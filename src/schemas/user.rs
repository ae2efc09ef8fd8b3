use serde::{Deserialize, Serialize};
use validator::Validate;

/// The signed-in student, as handed over by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CurrentUser {
    #[serde(rename = "_id")]
    #[serde(alias = "id")]
    #[validate(length(min = 1, message = "user id must not be empty"))]
    pub id: String,
    pub name: String,
    #[serde(default)]
    #[serde(rename = "rollNumber")]
    pub roll_number: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}
