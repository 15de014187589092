use std::collections::HashSet;

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::constants::{TIER_ONE_MIN_SHARED, TIER_TWO_MIN_SHARED};
use crate::models::UserProfile;

/// An idle user the searcher could be paired with.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub profile: &'a UserProfile,
    /// Whether the candidate already holds a relation edge
    pub linked: bool,
}

/// Priority bucket, lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    One,
    Two,
    Three,
}

impl Tier {
    pub fn for_overlap(like_overlap: usize) -> Self {
        if like_overlap >= TIER_ONE_MIN_SHARED {
            Tier::One
        } else if like_overlap >= TIER_TWO_MIN_SHARED {
            Tier::Two
        } else {
            Tier::Three
        }
    }
}

/// Entries of `wanted` that appear verbatim in `offered`, in `wanted` order.
///
/// Interests are exact, case-sensitive tokens.
pub fn shared_tokens(wanted: &[String], offered: &[String]) -> Vec<String> {
    if wanted.is_empty() || offered.is_empty() {
        return Vec::new();
    }
    let offered: HashSet<&str> = offered.iter().map(String::as_str).collect();
    wanted
        .iter()
        .filter(|token| offered.contains(token.as_str()))
        .cloned()
        .collect()
}

/// Likes of `me` that `other` also likes.
pub fn shared_likes(me: &UserProfile, other: &UserProfile) -> Vec<String> {
    shared_tokens(&me.likes, &other.likes)
}

/// Tier of `candidate` for `searcher`, or `None` if the candidate is filtered out.
pub fn rank(searcher: &UserProfile, candidate: &Candidate<'_>) -> Option<Tier> {
    if candidate.linked {
        return None;
    }
    if candidate.profile.likes.is_empty() {
        return Some(Tier::Three);
    }

    let like_overlap = shared_tokens(&searcher.likes, &candidate.profile.likes).len();
    let dislike_overlap = shared_tokens(&searcher.dislikes, &candidate.profile.likes).len();
    if dislike_overlap > like_overlap {
        return None;
    }

    Some(Tier::for_overlap(like_overlap))
}

/// Picks a companion for `searcher`: uniformly at random from the best non-empty tier.
pub fn select_partner<'a, R: Rng + ?Sized>(
    searcher: &UserProfile,
    candidates: &[Candidate<'a>],
    rng: &mut R,
) -> Option<&'a UserProfile> {
    let ranked: Vec<(Tier, &'a UserProfile)> = candidates
        .iter()
        .filter(|candidate| candidate.profile.id != searcher.id)
        .filter_map(|candidate| rank(searcher, candidate).map(|tier| (tier, candidate.profile)))
        .collect();

    let best = ranked.iter().map(|(tier, _)| *tier).min()?;
    let pool: Vec<&'a UserProfile> = ranked
        .into_iter()
        .filter(|(tier, _)| *tier == best)
        .map(|(_, profile)| profile)
        .collect();

    pool.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn profile(id: &str, likes: &[&str], dislikes: &[&str]) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            likes: likes.iter().map(|s| s.to_string()).collect(),
            dislikes: dislikes.iter().map(|s| s.to_string()).collect(),
            hi: String::new(),
        }
    }

    fn free(profile: &UserProfile) -> Candidate<'_> {
        Candidate { profile, linked: false }
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(Tier::for_overlap(0), Tier::Three);
        assert_eq!(Tier::for_overlap(2), Tier::Three);
        assert_eq!(Tier::for_overlap(3), Tier::Two);
        assert_eq!(Tier::for_overlap(4), Tier::Two);
        assert_eq!(Tier::for_overlap(5), Tier::One);
        assert_eq!(Tier::for_overlap(9), Tier::One);
    }

    #[test]
    fn test_five_shared_likes_always_wins() {
        let likes = ["hiking", "coffee", "art", "music", "travel"];
        let me = profile("me", &likes, &[]);
        let twin = profile("twin", &likes, &[]);
        let close = profile("close", &["hiking", "coffee", "art"], &[]);
        let stranger = profile("stranger", &[], &[]);
        let candidates = [free(&stranger), free(&close), free(&twin)];

        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = select_partner(&me, &candidates, &mut rng).unwrap();
            assert_eq!(picked.id, "twin");
        }
    }

    #[test]
    fn test_dislike_excludes_candidate() {
        let me = profile("me", &["hiking"], &["smoking"]);
        let smoker = profile("smoker", &["smoking"], &[]);
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(rank(&me, &free(&smoker)), None);
        assert!(select_partner(&me, &[free(&smoker)], &mut rng).is_none());
    }

    #[test]
    fn test_dislike_tie_is_kept() {
        let me = profile("me", &["hiking"], &["smoking"]);
        let other = profile("other", &["hiking", "smoking"], &[]);
        assert_eq!(rank(&me, &free(&other)), Some(Tier::Three));
    }

    #[test]
    fn test_linked_candidate_skipped() {
        let me = profile("me", &["art"], &[]);
        let busy = profile("busy", &["art"], &[]);
        let candidate = Candidate { profile: &busy, linked: true };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_partner(&me, &[candidate], &mut rng).is_none());
    }

    #[test]
    fn test_searcher_never_selects_self() {
        let me = profile("me", &["art"], &[]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_partner(&me, &[free(&me)], &mut rng).is_none());
    }

    #[test]
    fn test_tokens_are_not_substrings() {
        let wanted = vec!["art".to_string(), "c++".to_string(), "a.b".to_string()];
        let offered = vec!["smart".to_string(), "party".to_string(), "c++".to_string(), "axb".to_string()];
        assert_eq!(shared_tokens(&wanted, &offered), vec!["c++"]);
    }

    #[test]
    fn test_tokens_are_case_sensitive() {
        let wanted = vec!["Music".to_string()];
        let offered = vec!["music".to_string()];
        assert!(shared_tokens(&wanted, &offered).is_empty());
    }

    #[test]
    fn test_candidate_without_likes_is_tier_three() {
        let me = profile("me", &["art"], &["smoking"]);
        let blank = profile("blank", &[], &[]);
        assert_eq!(rank(&me, &free(&blank)), Some(Tier::Three));
    }

    #[test]
    fn test_random_pick_within_tier() {
        let me = profile("me", &["a", "b", "c"], &[]);
        let x = profile("x", &["a", "b", "c"], &[]);
        let y = profile("y", &["a", "b", "c", "d"], &[]);
        let candidates = [free(&x), free(&y)];

        let mut seen = HashSet::new();
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            seen.insert(select_partner(&me, &candidates, &mut rng).unwrap().id.clone());
        }
        assert_eq!(seen.len(), 2);
    }
}
