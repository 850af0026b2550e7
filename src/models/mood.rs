use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

/// Matching criteria for one mood
///
/// `keywords` are lower-case stems matched by substring containment against
/// mood tags and TMDb keyword names. `genres` are TMDb genre names matched
/// exactly. `label` and `emoji` are for display, though the label also
/// takes part in mood-tag matching.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MoodDefinition {
    pub id: &'static str,
    pub label: &'static str,
    pub emoji: &'static str,
    pub keywords: &'static [&'static str],
    pub genres: &'static [&'static str],
}

/// A closed mood enumeration backed by static definitions
pub trait MoodKey: Copy + FromStr<Err = AppError> + Send + Sync + 'static {
    /// Every member, in display order
    fn all() -> &'static [Self];

    fn definition(&self) -> &'static MoodDefinition;

    fn id(&self) -> &'static str {
        self.definition().id
    }
}

fn parse_mood<M: MoodKey>(s: &str) -> Result<M, AppError> {
    let wanted = s.trim().to_lowercase();
    M::all()
        .iter()
        .copied()
        .find(|m| m.id() == wanted)
        .ok_or_else(|| AppError::UnknownMood(s.to_string()))
}

// ============================================================================
// Primary taxonomy (mood picker)
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Excited,
    Relaxed,
    Romantic,
    Thoughtful,
    Nostalgic,
    Adventurous,
    Inspired,
}

const HAPPY: MoodDefinition = MoodDefinition {
    id: "happy",
    label: "Happy",
    emoji: "😊",
    keywords: &[
        "happy",
        "uplifting",
        "feel-good",
        "cheerful",
        "joy",
        "heartwarming",
        "friendship",
        "funny",
    ],
    genres: &["Comedy", "Family", "Animation", "Music"],
};

const SAD: MoodDefinition = MoodDefinition {
    id: "sad",
    label: "Sad",
    emoji: "😢",
    keywords: &[
        "sad",
        "tragic",
        "tearjerker",
        "grief",
        "loss",
        "heartbreak",
        "melancholy",
        "death",
    ],
    genres: &["Drama", "Romance", "War"],
};

const EXCITED: MoodDefinition = MoodDefinition {
    id: "excited",
    label: "Excited",
    emoji: "🤩",
    keywords: &[
        "exciting",
        "thrilling",
        "adrenaline",
        "intense",
        "explosive",
        "suspense",
        "chase",
        "heist",
    ],
    genres: &["Action", "Thriller", "Adventure", "Science Fiction"],
};

const RELAXED: MoodDefinition = MoodDefinition {
    id: "relaxed",
    label: "Relaxed",
    emoji: "😌",
    keywords: &[
        "relax",
        "calm",
        "cozy",
        "gentle",
        "peaceful",
        "lighthearted",
        "charming",
        "easygoing",
    ],
    genres: &["Comedy", "Family", "Animation", "Documentary"],
};

const ROMANTIC: MoodDefinition = MoodDefinition {
    id: "romantic",
    label: "Romantic",
    emoji: "💕",
    keywords: &[
        "romantic",
        "romance",
        "love",
        "passion",
        "relationship",
        "wedding",
        "heartfelt",
    ],
    genres: &["Romance"],
};

const THOUGHTFUL: MoodDefinition = MoodDefinition {
    id: "thoughtful",
    label: "Thoughtful",
    emoji: "🤔",
    keywords: &[
        "thought-provoking",
        "philosophical",
        "reflective",
        "cerebral",
        "introspective",
        "existential",
        "mind-bending",
        "moral",
    ],
    genres: &["Drama", "Mystery", "Science Fiction", "Documentary"],
};

const NOSTALGIC: MoodDefinition = MoodDefinition {
    id: "nostalgic",
    label: "Nostalgic",
    emoji: "📼",
    keywords: &[
        "nostalgi",
        "coming of age",
        "childhood",
        "retro",
        "memories",
        "classic",
        "small town",
    ],
    genres: &["Family", "Animation", "History", "Music"],
};

const ADVENTUROUS: MoodDefinition = MoodDefinition {
    id: "adventurous",
    label: "Adventurous",
    emoji: "🗺️",
    keywords: &[
        "adventur",
        "epic",
        "quest",
        "journey",
        "exploration",
        "survival",
        "heroic",
        "daring",
    ],
    genres: &["Adventure", "Fantasy", "Action", "Western"],
};

const INSPIRED: MoodDefinition = MoodDefinition {
    id: "inspired",
    label: "Inspired",
    emoji: "✨",
    keywords: &[
        "inspir",
        "triumph",
        "hope",
        "underdog",
        "empowering",
        "motivational",
        "biography",
        "true story",
    ],
    genres: &["Drama", "History", "Documentary"],
};

impl MoodKey for Mood {
    fn all() -> &'static [Self] {
        &[
            Mood::Happy,
            Mood::Sad,
            Mood::Excited,
            Mood::Relaxed,
            Mood::Romantic,
            Mood::Thoughtful,
            Mood::Nostalgic,
            Mood::Adventurous,
            Mood::Inspired,
        ]
    }

    fn definition(&self) -> &'static MoodDefinition {
        match self {
            Mood::Happy => &HAPPY,
            Mood::Sad => &SAD,
            Mood::Excited => &EXCITED,
            Mood::Relaxed => &RELAXED,
            Mood::Romantic => &ROMANTIC,
            Mood::Thoughtful => &THOUGHTFUL,
            Mood::Nostalgic => &NOSTALGIC,
            Mood::Adventurous => &ADVENTUROUS,
            Mood::Inspired => &INSPIRED,
        }
    }
}

impl FromStr for Mood {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mood(s)
    }
}

impl Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

// ============================================================================
// Mood-labeled route taxonomy
// ============================================================================

/// Moods offered by the labeled route; overlaps [`Mood`] in meaning but
/// carries its own keyword and genre sets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LabeledMood {
    Cheerful,
    Reflective,
    Gloomy,
    Humorous,
    Melancholy,
    Idyllic,
    Chill,
    Romantic,
    Weird,
    Tense,
    Fearful,
    Playful,
}

const CHEERFUL: MoodDefinition = MoodDefinition {
    id: "cheerful",
    label: "Cheerful",
    emoji: "😄",
    keywords: &["cheer", "joy", "upbeat", "bright", "feel-good", "sunny"],
    genres: &["Comedy", "Family", "Music"],
};

const REFLECTIVE: MoodDefinition = MoodDefinition {
    id: "reflective",
    label: "Reflective",
    emoji: "🪞",
    keywords: &["reflect", "contemplat", "meditative", "introspect", "quiet", "philosoph"],
    genres: &["Drama", "Documentary"],
};

const GLOOMY: MoodDefinition = MoodDefinition {
    id: "gloomy",
    label: "Gloomy",
    emoji: "🌧️",
    keywords: &["gloom", "bleak", "dark", "despair", "bitter", "noir"],
    genres: &["Drama", "Crime", "War"],
};

const HUMOROUS: MoodDefinition = MoodDefinition {
    id: "humorous",
    label: "Humorous",
    emoji: "😂",
    keywords: &["humor", "humour", "funny", "witty", "satire", "parody", "hilarious"],
    genres: &["Comedy"],
};

const MELANCHOLY: MoodDefinition = MoodDefinition {
    id: "melancholy",
    label: "Melancholy",
    emoji: "🥀",
    keywords: &["melanchol", "wistful", "longing", "bittersweet", "loneliness", "regret"],
    genres: &["Drama", "Romance"],
};

const IDYLLIC: MoodDefinition = MoodDefinition {
    id: "idyllic",
    label: "Idyllic",
    emoji: "🌄",
    keywords: &["idyllic", "pastoral", "serene", "countryside", "whimsical", "dreamy"],
    genres: &["Animation", "Family", "Fantasy"],
};

const CHILL: MoodDefinition = MoodDefinition {
    id: "chill",
    label: "Chill",
    emoji: "🧊",
    keywords: &["chill", "laid-back", "relax", "easygoing", "mellow", "slacker"],
    genres: &["Comedy", "Animation"],
};

const LABELED_ROMANTIC: MoodDefinition = MoodDefinition {
    id: "romantic",
    label: "Romantic",
    emoji: "❤️",
    keywords: &["romanc", "romantic", "love", "tender", "intimate", "swoon"],
    genres: &["Romance"],
};

const WEIRD: MoodDefinition = MoodDefinition {
    id: "weird",
    label: "Weird",
    emoji: "🌀",
    keywords: &["weird", "surreal", "bizarre", "quirky", "absurd", "offbeat", "trippy"],
    genres: &["Fantasy", "Science Fiction"],
};

const TENSE: MoodDefinition = MoodDefinition {
    id: "tense",
    label: "Tense",
    emoji: "😬",
    keywords: &["tense", "suspense", "gripping", "nail-biting", "paranoi", "claustrophob"],
    genres: &["Thriller", "Crime", "Mystery"],
};

const FEARFUL: MoodDefinition = MoodDefinition {
    id: "fearful",
    label: "Fearful",
    emoji: "😱",
    keywords: &["fear", "scary", "terrifying", "horror", "creepy", "haunting", "dread"],
    genres: &["Horror"],
};

const PLAYFUL: MoodDefinition = MoodDefinition {
    id: "playful",
    label: "Playful",
    emoji: "🎈",
    keywords: &["playful", "mischiev", "zany", "goofy", "silly", "whimsical"],
    genres: &["Animation", "Family", "Comedy"],
};

impl MoodKey for LabeledMood {
    fn all() -> &'static [Self] {
        &[
            LabeledMood::Cheerful,
            LabeledMood::Reflective,
            LabeledMood::Gloomy,
            LabeledMood::Humorous,
            LabeledMood::Melancholy,
            LabeledMood::Idyllic,
            LabeledMood::Chill,
            LabeledMood::Romantic,
            LabeledMood::Weird,
            LabeledMood::Tense,
            LabeledMood::Fearful,
            LabeledMood::Playful,
        ]
    }

    fn definition(&self) -> &'static MoodDefinition {
        match self {
            LabeledMood::Cheerful => &CHEERFUL,
            LabeledMood::Reflective => &REFLECTIVE,
            LabeledMood::Gloomy => &GLOOMY,
            LabeledMood::Humorous => &HUMOROUS,
            LabeledMood::Melancholy => &MELANCHOLY,
            LabeledMood::Idyllic => &IDYLLIC,
            LabeledMood::Chill => &CHILL,
            LabeledMood::Romantic => &LABELED_ROMANTIC,
            LabeledMood::Weird => &WEIRD,
            LabeledMood::Tense => &TENSE,
            LabeledMood::Fearful => &FEARFUL,
            LabeledMood::Playful => &PLAYFUL,
        }
    }
}

impl FromStr for LabeledMood {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mood(s)
    }
}

impl Display for LabeledMood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}
