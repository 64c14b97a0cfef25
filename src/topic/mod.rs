// src/topic/mod.rs - FAQ lookup and keyword topic filter
//
// Consulted before any session is created. A direct answer or a redirect
// bypasses the model entirely.

use std::collections::HashMap;

use crate::infra::config::TopicConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Canned FAQ answer.
    DirectAnswer(String),
    /// On topic; forward to the model.
    Relevant,
    /// Off topic; reply with the redirect message.
    Redirect(String),
}

pub struct TopicFilter {
    faqs: HashMap<String, String>,
    keywords: Vec<String>,
    redirect_message: String,
}

impl TopicFilter {
    pub fn from_config(config: &TopicConfig) -> Self {
        Self {
            faqs: config
                .faqs
                .iter()
                .map(|(q, a)| (q.trim().to_lowercase(), a.clone()))
                .collect(),
            keywords: config
                .keywords
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            redirect_message: config.redirect_message.clone(),
        }
    }

    pub fn classify(&self, text: &str) -> Classification {
        let lowered = text.trim().to_lowercase();

        if let Some(answer) = self.faqs.get(&lowered) {
            return Classification::DirectAnswer(answer.clone());
        }

        if self.keywords.iter().any(|k| lowered.contains(k.as_str())) {
            Classification::Relevant
        } else {
            Classification::Redirect(self.redirect_message.clone())
        }
    }
}
