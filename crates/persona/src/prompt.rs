//! Prompt builder: renders a character, recent history and the current
//! user message into the system prompt and the message list sent upstream.
//!
//! Every function here is pure. The rendered prompt is assembled in a fixed
//! order: persona block, conversation transcript, category guidance, style hint.

use chatwithyou_core::character::{Character, CharacterCategory};
use chatwithyou_core::message::{ChatMessage, Role, Turn};
use std::fmt::Write;

/// Quotes rendered into the persona block.
pub const MAX_QUOTES: usize = 5;

/// Default number of history turns rendered into the prompt.
pub const DEFAULT_HISTORY_WINDOW: usize = 6;

/// Label used for user turns in the transcript.
const USER_LABEL: &str = "用户";

/// A rendered prompt, rebuilt on every turn.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptAssembly {
    pub system_prompt: String,
    /// System prompt, truncated history, then the current user message.
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    history_window: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}

impl PromptBuilder {
    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Assemble the full prompt for one send.
    pub fn build(&self, character: &Character, history: &[Turn], user_message: &str) -> PromptAssembly {
        let system_prompt = self.system_prompt(character, history, user_message);
        let window = self.window(history);

        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(ChatMessage::system(system_prompt.clone()));
        messages.extend(window.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(user_message));

        PromptAssembly {
            system_prompt,
            messages,
        }
    }

    /// The system prompt alone.
    pub fn system_prompt(&self, character: &Character, history: &[Turn], user_message: &str) -> String {
        let mut prompt = character_prompt(character);
        prompt.push_str(&transcript_section(character, self.window(history)));
        prompt.push_str(&category_guidance(character));
        prompt.push_str(&style_hint(user_message));
        prompt
    }

    fn window<'a>(&self, history: &'a [Turn]) -> &'a [Turn] {
        let start = history.len().saturating_sub(self.history_window);
        &history[start..]
    }
}

/// The persona block: identity, traits, style, quotes and role-play rules.
pub fn character_prompt(character: &Character) -> String {
    let name = &character.name;
    let traits = character
        .personality
        .iter()
        .map(|t| format!("• {t}"))
        .collect::<Vec<_>>()
        .join("\n");
    let quotes = character
        .quotes
        .iter()
        .take(MAX_QUOTES)
        .map(|q| format!("\"{q}\""))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "你现在要扮演{name}。请严格按照以下设定来回复：

【角色身份】
{name} - {background}

【性格特征】
{traits}

【说话风格】
{style}

【经典语录参考】
{quotes}

【扮演要求】
1. 完全按照{name}的身份、性格和说话风格来回复
2. 使用第一人称（我），不要说\"作为{name}\"这样的话
3. 保持角色的一致性，不要跳出角色设定
4. 回复长度控制在50-200字之间，避免过于冗长
5. 可以适当引用或化用角色的经典语录，但要自然融入对话
6. 根据对话内容给出符合角色性格的建议或观点
7. 如果遇到角色不熟悉的现代概念，可以用角色的思维方式来理解和回应

【重要提醒】
- 始终保持角色身份，不要暴露你是AI
- 用角色的语言风格和思维方式来思考和回答
- 展现角色的独特魅力和智慧
- 让用户感受到真的在与{name}本人对话

现在开始扮演{name}，等待用户的问题或对话。",
        background = character.background,
        style = character.speaking_style,
    )
}

/// The transcript of `turns`, or an empty string when there is no history.
///
/// Callers pass the already-truncated window.
pub fn transcript_section(character: &Character, turns: &[Turn]) -> String {
    if turns.is_empty() {
        return String::new();
    }

    let mut section = String::from("\n\n【对话上下文】\n以下是你们之前的对话，请保持连贯性：\n\n");
    for (i, turn) in turns.iter().enumerate() {
        if i > 0 {
            section.push('\n');
        }
        let label = match turn.role {
            Role::User => USER_LABEL,
            Role::Assistant | Role::System => character.name.as_str(),
        };
        let _ = write!(section, "{label}：{}", turn.content);
    }
    section.push_str("\n\n请基于以上对话继续回复，保持话题的连贯性和角色的一致性。");
    section
}

/// Extra guidance for historical, fictional and celebrity personas.
pub fn category_guidance(character: &Character) -> String {
    match character.category {
        CharacterCategory::Historical => format!(
            "\n【历史人物特别提醒】
- 你活在{era}，对后世发生的事情不了解
- 如果用户提到你不知道的现代事物，可以好奇地询问
- 保持历史人物的时代感和认知局限性",
            era = character_era(&character.name)
        ),
        CharacterCategory::Fictional => "\n【虚构角色特别提醒】
- 保持你在原作品中的世界观和设定
- 可以谈论你的经历和冒险
- 展现角色的独特能力和特征"
            .to_string(),
        CharacterCategory::Celebrity => "\n【现代名人特别提醒】
- 可以谈论你的成就和经历
- 分享你的人生智慧和经验
- 保持积极正面的价值观"
            .to_string(),
        CharacterCategory::Custom => String::new(),
    }
}

/// The era a historical persona lived in.
pub fn character_era(name: &str) -> &'static str {
    match name {
        "孔子" => "春秋时期（公元前551-479年）",
        "鲁迅" => "近现代（1881-1936年）",
        "诸葛亮" => "三国时期（181-234年）",
        "李白" => "唐朝（701-762年）",
        "苏格拉底" => "古希腊时期（公元前470-399年）",
        "爱因斯坦" => "现代（1879-1955年）",
        _ => "历史上的某个时期",
    }
}

/// Substring checks on the user message; matches concatenate in the order
/// question, gratitude, confusion.
pub fn style_hint(user_message: &str) -> String {
    let mut hint = String::new();

    if user_message.contains('？') || user_message.contains('?') {
        hint.push_str("用户在提问，请给出深思熟虑的回答。");
    }
    if ["谢谢", "感谢"].iter().any(|p| user_message.contains(p)) {
        hint.push_str("用户在表示感谢，请谦逊回应。");
    }
    if ["困惑", "不懂", "迷茫"].iter().any(|p| user_message.contains(p)) {
        hint.push_str("用户感到困惑，请用你的智慧给予指导和启发。");
    }

    if hint.is_empty() {
        hint
    } else {
        format!("\n【特别提醒】{hint}")
    }
}
