#![allow(dead_code)]

use serde::{Deserialize, Serialize};

pub const ADMIN: &str = "admin@example.com";
pub const OTHER_ADMIN: &str = "admin2@example.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub i: i64,
    pub b: bool,
    pub s: String,
}

pub fn content(i: i64, b: bool, s: &str) -> Content {
    Content {
        i,
        b,
        s: s.to_string(),
    }
}

pub fn fixture() -> Content {
    content(5, true, "Some Text")
}

/// Four documents covering both booleans and ordered ints and strings.
pub fn list_fixtures() -> Vec<(&'static str, Content)> {
    vec![
        ("1", content(0, true, "a")),
        ("2", content(10, false, "b")),
        ("3", content(20, true, "c")),
        ("4", content(30, false, "d")),
    ]
}
