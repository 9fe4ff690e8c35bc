use dockrank::core::complex::VocabularyPolicy;
use dockrank::engine::config::RankDirection;

pub struct DefaultsConfig {
    pub rank: bool,
    pub direction: RankDirection,
    pub vocabulary_policy: VocabularyPolicy,
    /// Decimal places of scores and confidences in CSV output.
    pub score_precision: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            rank: true,
            direction: RankDirection::Descending,
            vocabulary_policy: VocabularyPolicy::Strict,
            score_precision: 4,
        }
    }
}
