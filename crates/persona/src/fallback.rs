//! Canned in-character lines used when every completion provider fails.

use rand::Rng;

const CONFUCIUS: &[&str] = &[
    "君子坦荡荡，小人长戚戚。请让我再思考一下你的问题。",
    "学而时习之，不亦说乎？不过我需要更多时间来理解你的意思。",
    "知之为知之，不知为不知，是知也。请稍后再问我这个问题。",
];

const LU_XUN: &[&str] = &[
    "我正在思考如何回答你的问题，请稍等片刻。",
    "这个问题很有意思，让我仔细想想再回复你。",
    "时间就像海绵里的水，挤一挤总还是有的。请给我一点时间思考。",
];

const EINSTEIN: &[&str] = &[
    "想象力比知识更重要。让我用想象力来思考你的问题。",
    "这是一个有趣的问题，需要我仔细思考。",
    "真理总是简单的，让我寻找简单的答案。",
];

const GENERIC: &[&str] = &[
    "请原谅，我需要一点时间来思考你的问题。",
    "这是一个很有意思的话题，让我仔细想想。",
    "请稍等，我正在组织语言来回答你。",
];

/// Lookup table of fallback lines keyed by exact character name.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackLines;

impl FallbackLines {
    /// The candidate lines for `name`; the generic set when unlisted.
    pub fn lines_for(&self, name: &str) -> &'static [&'static str] {
        match name {
            "孔子" => CONFUCIUS,
            "鲁迅" => LU_XUN,
            "爱因斯坦" => EINSTEIN,
            _ => GENERIC,
        }
    }

    /// Pick a line for `name` at random.
    pub fn pick(&self, name: &str) -> &'static str {
        self.pick_with(name, &mut rand::rng())
    }

    pub fn pick_with<R: Rng + ?Sized>(&self, name: &str, rng: &mut R) -> &'static str {
        let lines = self.lines_for(name);
        lines[rng.random_range(0..lines.len())]
    }
}
