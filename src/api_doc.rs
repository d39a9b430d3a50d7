//! The API document model produced for every annotated operation.

use crate::source::last_segment;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const METHOD_GET: &str = "get";
pub const METHOD_POST: &str = "post";

/// Order given to documents that were never numbered.
pub const DEFAULT_ORDER: u32 = 99;

/// One API operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDoc {
    pub title: String,
    /// Slash separated catalog path, e.g. `测试文档/书籍`
    pub catalog: String,
    pub description: String,
    pub remark: String,
    pub order: u32,
    pub request: ApiRequest,
    pub response: ApiResponse,
    pub response_fail: ApiResponse,
}

impl Default for ApiDoc {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiDoc {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            catalog: String::new(),
            description: String::new(),
            remark: String::new(),
            order: DEFAULT_ORDER,
            request: ApiRequest::default(),
            response: ApiResponse::default(),
            response_fail: ApiResponse::default(),
        }
    }

    /// Starts an operation's document from the file-level defaults.
    ///
    /// Catalog, remark, request headers and the success response are inherited.
    pub fn seeded(general: &ApiDoc) -> Self {
        let mut doc = Self::new();
        doc.catalog = general.catalog.clone();
        doc.remark = general.remark.clone();
        doc.request.headers = general.request.headers.clone();
        doc.response.params = general.response.params.clone();
        doc.response.example = general.response.example.clone();
        doc
    }

    /// A document without a title or a URL is dropped.
    pub fn is_invalid(&self) -> bool {
        self.title.is_empty() || self.request.url.is_empty()
    }

    /// Display name, `<catalog>/<title>`.
    pub fn name(&self) -> String {
        if self.catalog.is_empty() {
            self.title.clone()
        } else {
            format!("{}/{}", self.catalog, self.title)
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Lower-case HTTP method
    pub method: String,
    pub url: String,
    pub api_status: ApiStatus,
    pub headers: Vec<RequestParam>,
    pub path_variables: Vec<RequestParam>,
    pub query: Vec<RequestParam>,
    pub param_mode: ParamMode,
    pub params: Vec<RequestParam>,
    /// Pretty-printed example body, for JSON requests expanded from a type
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub param_json: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Pretty-printed example body
    pub example: String,
    pub params: Vec<ResponseParam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestParam {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CoarseType,
    pub required: bool,
    pub value: String,
    pub remark: String,
}

impl RequestParam {
    /// Builds a parameter from the tokens of an annotation line.
    pub fn new(name: &str, type_name: &str, required: &str, value: &str, remark: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: CoarseType::classify(type_name),
            required: parse_required(required),
            value: value.to_string(),
            remark: remark.to_string(),
        }
    }

    /// Like [`RequestParam::new`], with the type narrowed to what a header can carry.
    pub fn header(name: &str, type_name: &str, required: &str, value: &str, remark: &str) -> Self {
        Self {
            kind: CoarseType::header(type_name),
            ..Self::new(name, type_name, required, value, remark)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseParam {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CoarseType,
    pub remark: String,
}

impl ResponseParam {
    pub fn new(name: &str, type_name: &str, remark: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: CoarseType::classify(type_name),
            remark: remark.to_string(),
        }
    }
}

/// Accepted spellings of "required".
pub fn parse_required(token: &str) -> bool {
    token.eq_ignore_ascii_case("true") || matches!(token, "1" | "是" | "必填")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamMode {
    #[default]
    #[serde(rename = "urlencoded")]
    UrlEncoded,
    #[serde(rename = "formdata")]
    FormData,
    #[serde(rename = "json")]
    Json,
}

impl ParamMode {
    /// Default body encoding for a method.
    pub fn for_method(method: &str) -> Self {
        if method == METHOD_POST {
            ParamMode::Json
        } else {
            ParamMode::UrlEncoded
        }
    }

    pub fn parse(mode: &str) -> Option<Self> {
        match mode.to_lowercase().as_str() {
            "urlencoded" | "url-encoded" => Some(ParamMode::UrlEncoded),
            "formdata" | "form-data" => Some(ParamMode::FormData),
            "json" => Some(ParamMode::Json),
            _ => None,
        }
    }
}

/// Lifecycle state of an API, serialized as `"0"` to `"5"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiStatus {
    #[default]
    #[serde(rename = "0")]
    None,
    #[serde(rename = "1")]
    Developing,
    #[serde(rename = "2")]
    Testing,
    #[serde(rename = "3")]
    Completed,
    #[serde(rename = "4")]
    NeedsRevision,
    #[serde(rename = "5")]
    Deprecated,
}

impl ApiStatus {
    /// Parses a status code; anything outside `0..=5` is [`ApiStatus::None`].
    pub fn from_code(code: &str) -> Self {
        match code {
            "1" => ApiStatus::Developing,
            "2" => ApiStatus::Testing,
            "3" => ApiStatus::Completed,
            "4" => ApiStatus::NeedsRevision,
            "5" => ApiStatus::Deprecated,
            _ => ApiStatus::None,
        }
    }
}

/// The small vocabulary of parameter types used in documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoarseType {
    Int,
    Long,
    Number,
    Boolean,
    String,
    Array,
    Object,
}

impl CoarseType {
    /// Maps a type name, as written in source or in an annotation, to its coarse type.
    pub fn classify(type_name: &str) -> Self {
        let type_name = type_name.trim().trim_start_matches('&');
        if type_name.starts_with('[') || type_name.starts_with("Vec<") {
            return CoarseType::Array;
        }
        match last_segment(type_name) {
            "i8" | "i16" | "i32" | "u8" | "u16" | "u32" | "int" | "integer" | "short" | "byte" => {
                CoarseType::Int
            }
            "i64" | "u64" | "i128" | "u128" | "isize" | "usize" | "long" => CoarseType::Long,
            "f32" | "f64" | "float" | "double" | "number" => CoarseType::Number,
            "bool" | "boolean" => CoarseType::Boolean,
            "String" | "str" | "char" | "string" => CoarseType::String,
            "array" => CoarseType::Array,
            _ => CoarseType::Object,
        }
    }

    /// Headers only carry numbers or text.
    pub fn header(type_name: &str) -> Self {
        if Self::classify(type_name).is_numeric() {
            CoarseType::Number
        } else {
            CoarseType::String
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, CoarseType::Int | CoarseType::Long | CoarseType::Number)
    }

    /// Whether a source type name is a scalar rather than a declared type.
    pub fn is_primitive(type_name: &str) -> bool {
        !matches!(Self::classify(type_name), CoarseType::Array | CoarseType::Object)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CoarseType::Int => "int",
            CoarseType::Long => "long",
            CoarseType::Number => "number",
            CoarseType::Boolean => "boolean",
            CoarseType::String => "string",
            CoarseType::Array => "array",
            CoarseType::Object => "object",
        }
    }
}

impl fmt::Display for CoarseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
