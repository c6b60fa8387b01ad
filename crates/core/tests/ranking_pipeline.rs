use std::collections::HashMap;
use std::sync::Arc;

use curate_core::catalog::{CatalogQueryService, ProfileQueryService};
use curate_core::errors::{CollaboratorError, RecommendError, RecordKind};
use curate_core::ranking::{
    CandidateSource, MissingVectorPolicy, RankingOptions, RankingPipeline, SkipReason,
};
use curate_core::scoring::{ExclusionMode, Scorer, ScoringPolicy};
use curate_core::vectors::{SimilarityMetric, VectorIndex};
use curate_core::{Dimension, Item, ItemId, Profile, ProfileId};
use rust_decimal::Decimal;

struct FixedCatalog {
    items: Vec<Item>,
}

impl CatalogQueryService for FixedCatalog {
    fn all_items(&self) -> Result<Vec<Item>, CollaboratorError> {
        Ok(self.items.clone())
    }

    fn item_by_id(&self, id: &ItemId) -> Result<Item, CollaboratorError> {
        self.items.iter().find(|item| &item.id == id).cloned().ok_or_else(|| {
            CollaboratorError::NotFound { kind: RecordKind::Item, id: id.to_string() }
        })
    }
}

struct OfflineCatalog;

impl CatalogQueryService for OfflineCatalog {
    fn all_items(&self) -> Result<Vec<Item>, CollaboratorError> {
        Err(CollaboratorError::Unavailable("catalog replica is offline".to_string()))
    }

    fn item_by_id(&self, _id: &ItemId) -> Result<Item, CollaboratorError> {
        Err(CollaboratorError::Unavailable("catalog replica is offline".to_string()))
    }
}

struct Profiles(Vec<Profile>);

impl ProfileQueryService for Profiles {
    fn profile_by_id(&self, id: &ProfileId) -> Result<Profile, CollaboratorError> {
        self.0.iter().find(|profile| &profile.id == id).cloned().ok_or_else(|| {
            CollaboratorError::NotFound { kind: RecordKind::Profile, id: id.to_string() }
        })
    }
}

fn item(id: &str, brand: &str, country: &str, style: &str, rating: &str) -> Item {
    Item {
        id: ItemId::new(id),
        label: format!("{id} label"),
        brand: brand.to_string(),
        country: country.to_string(),
        style: style.to_string(),
        rating: rating.parse().expect("rating literal"),
        price: Decimal::new(250, 2),
    }
}

/// Catalog order: r, q, s, p, liked. `q` and `p` are identical twins that
/// only differ by identifier, listed against their id order.
fn tie_catalog() -> Vec<Item> {
    vec![
        item("r", "Fold", "DE", "stout", "5"),
        item("q", "Fold", "BE", "saison", "4.5"),
        item("s", "Other", "US", "lager", "4"),
        item("p", "Fold", "BE", "saison", "4.5"),
        item("liked", "Other", "US", "pils", "3"),
    ]
}

fn tie_vectors() -> Arc<VectorIndex> {
    let vectors = HashMap::from([
        (ItemId::new("liked"), vec![1.0, 0.0, 0.0]),
        (ItemId::new("r"), vec![0.0, 1.0, 0.0]),
        (ItemId::new("p"), vec![0.0, 1.0, 0.0]),
        (ItemId::new("s"), vec![0.6, 0.8, 0.0]),
        (ItemId::new("q"), vec![0.0, 1.0, 0.0]),
    ]);
    Arc::new(VectorIndex::new(vectors, SimilarityMetric::Cosine).expect("valid vectors"))
}

fn tie_profile() -> Profile {
    Profile::new("taster")
        .with_liked_items(["liked"])
        .with_liked_brands(["Fold"])
        .with_liked_styles(["saison"])
}

fn ids(ranked: &curate_core::RankedCandidates) -> Vec<&str> {
    ranked.iter().map(|candidate| candidate.item().id.as_str()).collect()
}

fn excluding_liked() -> RankingOptions {
    RankingOptions { exclude_liked: true, ..RankingOptions::default() }
}

#[test]
fn equal_scores_keep_catalog_order_not_id_order() {
    let pipeline = RankingPipeline::new(tie_vectors(), FixedCatalog { items: tie_catalog() })
        .with_options(excluding_liked());

    let ranked = pipeline.rank(&tie_profile()).expect("ranking succeeds");

    assert_eq!(ids(&ranked), vec!["q", "p", "r", "s"]);
    for candidate in ranked.top(2) {
        assert!((candidate.total_score() - 3.1).abs() < 1e-9, "{}", candidate.total_score());
    }
    assert!(ranked.skipped().is_empty());
}

#[test]
fn totals_equal_the_sum_of_applied_scores() {
    let pipeline = RankingPipeline::new(tie_vectors(), FixedCatalog { items: tie_catalog() });
    let ranked = pipeline.rank(&tie_profile()).expect("ranking succeeds");

    for candidate in &ranked {
        let sum: f64 = candidate.applied_scores().iter().map(|score| score.value).sum();
        assert_eq!(candidate.total_score(), sum);
        assert_eq!(candidate.applied_scores().len(), 6);
    }
}

#[test]
fn explanations_follow_triggered_dimensions() {
    let pipeline = RankingPipeline::new(tie_vectors(), FixedCatalog { items: tie_catalog() })
        .with_options(excluding_liked());
    let ranked = pipeline.rank(&tie_profile()).expect("ranking succeeds");
    let twin = &ranked.as_slice()[0];

    let texts: Vec<&str> = twin.explanations().map(|explanation| explanation.text()).collect();
    assert_eq!(
        texts,
        vec![
            "This item has a high rating score.",
            "This item is from a brand the profile likes.",
            "This item is a style the profile likes.",
        ]
    );
    assert!(twin.score_for(&Dimension::Similarity).is_some_and(|score| !score.is_triggered()));
}

#[test]
fn repeated_runs_are_identical_including_parallel_scoring() {
    let catalog = Arc::new(FixedCatalog { items: tie_catalog() });
    let sequential = RankingPipeline::new(tie_vectors(), Arc::clone(&catalog));
    let parallel = RankingPipeline::new(tie_vectors(), Arc::clone(&catalog))
        .with_options(RankingOptions { parallel: true, ..RankingOptions::default() });
    let profile = tie_profile();

    let first = sequential.rank(&profile).expect("first run");
    let second = sequential.rank(&profile).expect("second run");
    let third = parallel.rank(&profile).expect("parallel run");

    assert_eq!(first.as_slice(), second.as_slice());
    assert_eq!(first.as_slice(), third.as_slice());
}

#[test]
fn missing_vector_is_skipped_by_default() {
    let mut items = tie_catalog();
    items.insert(1, item("orphan", "Fold", "BE", "saison", "5"));
    let pipeline = RankingPipeline::new(tie_vectors(), FixedCatalog { items });

    let ranked = pipeline.rank(&tie_profile()).expect("missing vectors do not abort");

    assert!(!ids(&ranked).contains(&"orphan"));
    assert_eq!(ranked.len(), 5);
    assert_eq!(ranked.skipped().len(), 1);
    assert_eq!(ranked.skipped()[0].item_id, ItemId::new("orphan"));
    assert_eq!(ranked.skipped()[0].reason, SkipReason::VectorMissing);
}

#[test]
fn missing_vector_aborts_when_configured() {
    let mut items = tie_catalog();
    items.push(item("orphan", "Fold", "BE", "saison", "5"));
    let pipeline = RankingPipeline::new(tie_vectors(), FixedCatalog { items }).with_options(
        RankingOptions { missing_vector: MissingVectorPolicy::Abort, ..RankingOptions::default() },
    );

    let error = pipeline.rank(&tie_profile()).expect_err("abort policy propagates");
    assert_eq!(error, RecommendError::VectorMissing(ItemId::new("orphan")));
}

#[test]
fn empty_catalog_ranks_to_an_empty_sequence() {
    let pipeline = RankingPipeline::new(tie_vectors(), FixedCatalog { items: Vec::new() });
    let ranked = pipeline.rank(&tie_profile()).expect("empty catalog is not an error");

    assert!(ranked.is_empty());
    assert_eq!(ranked.iter().count(), 0);
}

#[test]
fn unavailable_catalog_surfaces_as_catalog_unavailable() {
    let pipeline = RankingPipeline::new(tie_vectors(), OfflineCatalog);
    let error = pipeline.rank(&tie_profile()).expect_err("offline catalog fails");

    assert_eq!(error.error_class(), "catalog_unavailable");
    assert!(error.to_string().contains("catalog replica is offline"));
}

#[test]
fn profile_without_usable_likes_is_incomplete() {
    let pipeline = RankingPipeline::new(tie_vectors(), FixedCatalog { items: tie_catalog() });
    let profile = Profile::new("newcomer").with_liked_brands(["Fold"]);

    let error = pipeline.rank(&profile).expect_err("no liked items");
    assert_eq!(error, RecommendError::ProfileIncomplete(ProfileId::new("newcomer")));
}

#[test]
fn prohibited_countries_are_penalized_or_filtered() {
    let profile = tie_profile().with_prohibited_countries(["DE"]);

    let penalized = RankingPipeline::new(tie_vectors(), FixedCatalog { items: tie_catalog() })
        .with_options(excluding_liked())
        .rank(&profile)
        .expect("penalty mode ranks everything");
    assert_eq!(ids(&penalized).last(), Some(&"r"));
    assert!(penalized.as_slice()[3].is_excluded());

    let policy = ScoringPolicy { exclusion_mode: ExclusionMode::Filter, ..ScoringPolicy::default() };
    let filtered = RankingPipeline::new(tie_vectors(), FixedCatalog { items: tie_catalog() })
        .with_scorer(Scorer::from_policy(&policy))
        .with_options(excluding_liked())
        .rank(&profile)
        .expect("filter mode ranks the rest");
    assert_eq!(ids(&filtered), vec!["q", "p", "s"]);
    assert_eq!(filtered.skipped()[0].reason, SkipReason::Prohibited);
}

#[test]
fn similar_to_liked_source_limits_candidates() {
    let pipeline = RankingPipeline::new(tie_vectors(), FixedCatalog { items: tie_catalog() })
        .with_options(RankingOptions {
            source: CandidateSource::SimilarToLiked { top_n: 1 },
            ..RankingOptions::default()
        });

    let ranked = pipeline.rank(&tie_profile()).expect("ranking succeeds");
    assert_eq!(ids(&ranked), vec!["s"]);
}

#[test]
fn recommend_for_resolves_the_profile_first() {
    let pipeline = RankingPipeline::new(tie_vectors(), FixedCatalog { items: tie_catalog() })
        .with_options(excluding_liked());
    let profiles = Profiles(vec![tie_profile()]);

    let ranked =
        pipeline.recommend_for(&profiles, &ProfileId::new("taster")).expect("known profile");
    assert_eq!(ranked.profile_id(), &ProfileId::new("taster"));
    assert_eq!(ids(&ranked)[..2], ["q", "p"]);

    let missing = pipeline
        .recommend_for(&profiles, &ProfileId::new("ghost"))
        .expect_err("unknown profile");
    assert_eq!(missing.error_class(), "not_found");
    assert_eq!(missing.to_string(), "profile `ghost` was not found");
}

#[test]
fn tied_items_are_never_reordered_by_identifier() {
    let items = vec![
        item("zz", "Fold", "BE", "saison", "4.5"),
        item("aa", "Fold", "BE", "saison", "4.5"),
        item("liked", "Other", "US", "pils", "3"),
    ];
    let vectors = HashMap::from([
        (ItemId::new("liked"), vec![1.0, 0.0, 0.0]),
        (ItemId::new("zz"), vec![0.0, 1.0, 0.0]),
        (ItemId::new("aa"), vec![0.0, 1.0, 0.0]),
    ]);
    let index = Arc::new(VectorIndex::new(vectors, SimilarityMetric::Cosine).expect("valid vectors"));
    let pipeline =
        RankingPipeline::new(index, FixedCatalog { items }).with_options(excluding_liked());

    let ranked = pipeline.rank(&tie_profile()).expect("ranking succeeds");

    assert_eq!(ids(&ranked), vec!["zz", "aa"]);
    assert_eq!(ranked.as_slice()[0].total_score(), ranked.as_slice()[1].total_score());
}
