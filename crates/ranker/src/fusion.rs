//! Score fusion: `score = fts_weight·q_kw +
//! vec_weight·q_vec + (q_kw>0 ∧ q_vec>0 ? dual_match_bonus : 0)`.

use kg_core::config::SearchConfig;

/// One candidate's calibrated per-channel quantiles, before fusion.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelQuantiles {
    pub keyword: f32,
    pub vector: f32,
}

/// Fuse a candidate's calibrated quantiles into one score.
///
/// spec.md §9 open question, resolved here: `vector_weight=0` fully
/// suppresses the vector channel regardless of stored breakpoints, meaning
/// a weighted-out channel neither contributes to the weighted sum nor
/// counts as "present" for the dual-match bonus. Symmetric for
/// `fts_weight=0`, since the spec gives no reason the two channels should
/// be treated asymmetrically.
pub fn fuse(quantiles: ChannelQuantiles, cfg: &SearchConfig) -> f32 {
    let kw_active = cfg.fts_weight > 0.0 && quantiles.keyword > 0.0;
    let vec_active = cfg.vector_weight > 0.0 && quantiles.vector > 0.0;

    let weighted = cfg.fts_weight * quantiles.keyword + cfg.vector_weight * quantiles.vector;
    let bonus = if kw_active && vec_active { cfg.dual_match_bonus } else { 0.0 };
    weighted + bonus
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SearchConfig {
        SearchConfig {
            fts_weight: 0.5,
            vector_weight: 0.5,
            dual_match_bonus: 0.1,
            use_reranker: false,
            reranker_model: String::new(),
            auto_calibrate_threshold: 0.05,
        }
    }

    #[test]
    fn scenario_four_from_spec() {
        // spec.md §8 scenario 4: keyword-only hit with q_kw=0.8, weights
        // 0.5/0.5, bonus 0.1 -> fused score 0.4 (no bonus).
        let q = ChannelQuantiles { keyword: 0.8, vector: 0.0 };
        let score = fuse(q, &cfg());
        assert!((score - 0.4).abs() < 1e-6);
    }

    #[test]
    fn both_channels_present_adds_bonus() {
        let q = ChannelQuantiles { keyword: 0.8, vector: 0.6 };
        let score = fuse(q, &cfg());
        // 0.5*0.8 + 0.5*0.6 + 0.1 = 0.8
        assert!((score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn bonus_is_never_negative() {
        let q = ChannelQuantiles { keyword: 0.0, vector: 0.0 };
        assert!(fuse(q, &cfg()) >= 0.0);
    }

    #[test]
    fn monotone_in_each_quantile() {
        let base = ChannelQuantiles { keyword: 0.2, vector: 0.2 };
        let higher_kw = ChannelQuantiles { keyword: 0.5, vector: 0.2 };
        assert!(fuse(higher_kw, &cfg()) >= fuse(base, &cfg()));
        let higher_vec = ChannelQuantiles { keyword: 0.2, vector: 0.5 };
        assert!(fuse(higher_vec, &cfg()) >= fuse(base, &cfg()));
    }

    #[test]
    fn zero_vector_weight_suppresses_channel_and_bonus() {
        let mut c = cfg();
        c.vector_weight = 0.0;
        let q = ChannelQuantiles { keyword: 0.8, vector: 0.9 };
        // vector contributes nothing, and the dual-match bonus doesn't
        // fire even though both channels technically matched.
        let score = fuse(q, &c);
        assert!((score - 0.4).abs() < 1e-6);
    }
}
