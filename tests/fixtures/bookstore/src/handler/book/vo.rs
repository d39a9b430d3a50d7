use crate::comm::*;
use crate::model::book;
use crate::model::review as review1;
use serde::{Deserialize, Serialize};

/// 列表查询条件
#[derive(Debug, Deserialize)]
pub struct ListReq {
    #[serde(flatten)]
    pub page: Page,
    /// 关键字
    pub keyword: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListRsp {
    /// 总条数
    pub total_count: i64,
    /// 列表
    pub list: Vec<ListItem>,
}

#[derive(Debug, Serialize)]
pub struct ListItem {
    #[serde(flatten)]
    pub book: book::Book,
    /// 评论数
    pub review_count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detail {
    /// 书籍
    pub book: book::Book,
    /// 热门评论
    pub top_reviews: Vec<review1::Review>,
    pub updated_at: Option<String>,
}
