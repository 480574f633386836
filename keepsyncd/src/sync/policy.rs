use serde::{Deserialize, Serialize};

use super::model::TargetItem;

/// Case rewrite applied to every synced item's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCase {
    #[default]
    NoChange,
    Upper,
    Lower,
    Sentence,
    Title,
}

impl ItemCase {
    pub fn apply(self, text: &str) -> String {
        match self {
            ItemCase::NoChange => text.to_string(),
            ItemCase::Upper => text.to_uppercase(),
            ItemCase::Lower => text.to_lowercase(),
            ItemCase::Sentence => {
                let mut chars = text.chars();
                match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.as_str().to_lowercase().chars())
                        .collect(),
                    None => String::new(),
                }
            }
            ItemCase::Title => {
                let mut out = String::with_capacity(text.len());
                let mut at_word_start = true;
                for ch in text.chars() {
                    if ch.is_alphabetic() {
                        if at_word_start {
                            out.extend(ch.to_uppercase());
                        } else {
                            out.extend(ch.to_lowercase());
                        }
                        at_word_start = false;
                    } else {
                        out.push(ch);
                        at_word_start = true;
                    }
                }
                out
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListPolicy {
    pub item_case: ItemCase,
    pub auto_sort: bool,
}

impl ListPolicy {
    pub fn normalize(&self, text: &str) -> String {
        self.item_case.apply(text)
    }

    /// Orders unchecked items case-insensitively; checked items keep their
    /// relative order after them. Returns `items` unchanged when sorting is off.
    pub fn arrange(&self, items: Vec<TargetItem>) -> Vec<TargetItem> {
        if !self.auto_sort {
            return items;
        }
        let (mut unchecked, checked): (Vec<_>, Vec<_>) =
            items.into_iter().partition(|item| !item.completed);
        unchecked.sort_by_cached_key(|item| item.text.to_lowercase());
        unchecked.extend(checked);
        unchecked
    }
}
