use serde::{Deserialize, Serialize};

/// Envelope of every response.
#[derive(Debug, Serialize)]
pub struct HttpCode {
    /// 错误码
    pub errcode: i32,
    /// 错误说明
    pub errmsg: String,
}

#[derive(Debug, Deserialize)]
pub struct Page {
    /// 第几页
    pub page: i32,
    /// 每页条数
    pub page_size: i32,
}
