use crate::volcano::LabelRule;

/// Enum representing the volcano plot variants.
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum VolcanoPreset {
    /// |log2FC| >= 0.5, labelling every gene past the fixed labelling cutoffs
    Standard,

    /// |log2FC| >= 1.0, labelling the 50 most extreme genes by fold change and by p-value
    TopN,
}

/// Returns the log2 fold change threshold for a volcano preset.
pub fn get_fc_threshold(preset: &VolcanoPreset) -> f64 {
    match preset {
        VolcanoPreset::Standard => 0.5,
        VolcanoPreset::TopN => 1.0,
    }
}

/// Returns the labelling rule for a volcano preset.
///
/// # Arguments
///
/// * `preset` - A reference to a `VolcanoPreset` enum variant.
/// * `top_n` - Overrides the number of genes labelled per criterion, for `TopN`.
/// * `min_neg_log10_p` - The -log10 p-value cutoff used for labelling, for `Standard`.
/// * `min_abs_fc` - The absolute log2 fold change cutoff used for labelling, for `Standard`.
pub fn get_label_rule(
    preset: &VolcanoPreset,
    top_n: Option<usize>,
    min_neg_log10_p: f64,
    min_abs_fc: f64,
) -> LabelRule {
    match preset {
        VolcanoPreset::Standard => LabelRule::Significant {
            min_neg_log10_p,
            min_abs_fc,
        },
        VolcanoPreset::TopN => LabelRule::TopN(top_n.unwrap_or(50)),
    }
}
