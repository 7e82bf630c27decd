//! Provider identifiers

use std::borrow::{Borrow, Cow};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an upstream provider, e.g. `openai` or `claude`
///
/// The set is open: registries accept any identifier, the constants below
/// name the providers that ship with the crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(Cow<'static, str>);

impl ProviderId {
    pub const OPENAI: Self = Self::from_static("openai");
    pub const CLAUDE: Self = Self::from_static("claude");
    pub const QWEN: Self = Self::from_static("qwen");
    pub const GEMINI: Self = Self::from_static("gemini");
    pub const DEEPSEEK: Self = Self::from_static("deepseek");
    pub const SILICONFLOW: Self = Self::from_static("siliconflow");
    pub const MISTRAL: Self = Self::from_static("mistral");
    pub const GROQ: Self = Self::from_static("groq");
    pub const OPENROUTER: Self = Self::from_static("openrouter");
    pub const COZE: Self = Self::from_static("coze");
    pub const DOUBAO: Self = Self::from_static("doubao");
    pub const ERNIE: Self = Self::from_static("ernie");
    pub const QIHOO_360: Self = Self::from_static("360");
    pub const BAICHUAN: Self = Self::from_static("baichuan");
    pub const CHATGLM: Self = Self::from_static("chatglm");
    pub const COHERE: Self = Self::from_static("cohere");
    pub const HUNYUAN: Self = Self::from_static("hunyuan");
    pub const MINIMAX: Self = Self::from_static("minimax");
    pub const MOONSHOT: Self = Self::from_static("moonshot");
    pub const NOVITA: Self = Self::from_static("novita");
    pub const OLLAMA: Self = Self::from_static("ollama");
    pub const SPARK: Self = Self::from_static("spark");
    pub const STEPFUN: Self = Self::from_static("stepfun");
    pub const TOGETHER: Self = Self::from_static("together");
    pub const XAI: Self = Self::from_static("xai");
    pub const YI: Self = Self::from_static("yi");

    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProviderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ProviderId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProviderId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl PartialEq<str> for ProviderId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ProviderId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
