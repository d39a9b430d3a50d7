use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use validator::Validate;

pub type Id = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Novel,
    Science,
}

#[serde_as]
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Book {
    /// 书籍ID
    #[serde_as(as = "DisplayFromStr")]
    pub id: Id,
    /// 书名
    #[validate(required)]
    pub title: Option<String>,
    /// 作者
    pub author: String,
    #[serde(rename = "type")]
    pub kind: Category,
    /// 价格
    pub price: f64,
    /// 标签
    pub tags: Vec<String>,
    #[serde(skip)]
    pub stock: u32,
}
