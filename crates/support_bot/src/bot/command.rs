use std::str::FromStr;

use strum::{AsRefStr, EnumString};

/// 内联按钮携带的回调数据
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Signal {
    Like,
    Dislike,
    RequestHuman,
}

/// 机器人支持的命令，无法识别的命令按普通文本处理
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Report,
    /// None 表示使用配置中的默认天数
    Stats(Option<u32>),
    AddAdmin(Option<i64>),
    RemoveAdmin(Option<i64>),
    Tag(Option<TagArgs>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagArgs {
    pub conversation_id: i32,
    /// 为空表示清除分类
    pub category: Option<String>,
}

impl Command {
    pub fn is_admin_only(&self) -> bool {
        !matches!(self, Command::Start)
    }

    /// 解析 "/name@bot args" 形式的命令
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head);

        let command = match name {
            "start" => Command::Start,
            "report" => Command::Report,
            "stats" => Command::Stats(parse_arg(args)),
            "add_admin" => Command::AddAdmin(parse_arg(args)),
            "remove_admin" => Command::RemoveAdmin(parse_arg(args)),
            "tag" => Command::Tag(parse_tag(args)),
            _ => return None,
        };
        Some(command)
    }
}

fn parse_arg<T: FromStr>(args: &str) -> Option<T> {
    args.split_whitespace().next()?.parse().ok()
}

fn parse_tag(args: &str) -> Option<TagArgs> {
    let (id, category) = match args.split_once(char::is_whitespace) {
        Some((id, category)) => (id, category.trim()),
        None => (args, ""),
    };
    let conversation_id = id.trim_start_matches('#').trim_start_matches("ID").parse().ok()?;
    Some(TagArgs {
        conversation_id,
        category: (!category.is_empty()).then(|| category.to_string()),
    })
}
