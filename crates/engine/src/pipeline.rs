use std::cmp::Reverse;
use std::time::{Duration, Instant};

use log::debug;

use crate::dsl::{Query, SearchError, SearchParser};
use crate::eval::Selection;
use crate::gallery::{Gallery, Picture, PictureId, Viewer};
use crate::tags::TagTree;

/// Shared, state-independent pipeline context.
struct PipelineCtx<'g> {
    gallery: &'g Gallery,
    viewer: Viewer,
    /// Original query string, if we parsed from text.
    query_str: Option<String>,
    /// Number of matches before any limit was applied.
    result_total: usize,
}

/// Pipeline created, nothing parsed yet.
pub struct InitialState;

pub struct ParsedState {
    query: Query,
}

/// Query applied; hits are ascending by id.
pub struct ExecutedState {
    query: Query,
    hits: Vec<PictureId>,
}

/// Hits ordered newest first, possibly truncated.
pub struct OrderedState {
    results: Vec<PictureId>,
}

/// Stages for which we record timings.
#[derive(Copy, Clone, Debug)]
pub enum Stage {
    Parse,
    Exec,
    Order,
}

#[derive(Debug, Clone, Default)]
pub struct SearchMetrics {
    pub parse_time: Option<Duration>,
    pub exec_time: Option<Duration>,
    pub order_time: Option<Duration>,
}

impl SearchMetrics {
    /// Total time across all measured stages.
    pub fn total(&self) -> Duration {
        self.parse_time.unwrap_or_default()
            + self.exec_time.unwrap_or_default()
            + self.order_time.unwrap_or_default()
    }
}

/// Strategy trait for timing behavior.
pub trait Timer {
    /// Run `f`, optionally recording how long it took under `stage`.
    fn measure<F, R>(&mut self, stage: Stage, f: F) -> R
    where
        F: FnOnce() -> R;

    fn metrics(&self) -> Option<&SearchMetrics> {
        None
    }
}

#[derive(Debug, Default)]
pub struct NoopTimer;

impl Timer for NoopTimer {
    #[inline]
    fn measure<F, R>(&mut self, _stage: Stage, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        f()
    }
}

#[derive(Debug, Default)]
pub struct MetricsTimer {
    metrics: SearchMetrics,
}

impl Timer for MetricsTimer {
    fn measure<F, R>(&mut self, stage: Stage, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        match stage {
            Stage::Parse => self.metrics.parse_time = Some(elapsed),
            Stage::Exec => self.metrics.exec_time = Some(elapsed),
            Stage::Order => self.metrics.order_time = Some(elapsed),
        }

        result
    }

    fn metrics(&self) -> Option<&SearchMetrics> {
        Some(&self.metrics)
    }
}

/// Type-safe search pipeline: parse, execute against the viewer's visible
/// pictures, then order. The typestate `S` enforces that order at compile
/// time and `T` decides whether stages are timed.
pub struct SearchPipeline<'g, S, T: Timer = NoopTimer> {
    ctx: PipelineCtx<'g>,
    state: S,
    timer: T,
}

impl<'g, T: Timer + Default> SearchPipeline<'g, InitialState, T> {
    pub fn new(gallery: &'g Gallery, viewer: Viewer) -> Self {
        Self {
            ctx: PipelineCtx {
                gallery,
                viewer,
                query_str: None,
                result_total: 0,
            },
            state: InitialState,
            timer: T::default(),
        }
    }
}

impl<S, T: Timer> SearchPipeline<'_, S, T> {
    pub fn metrics(&self) -> Option<&SearchMetrics> {
        self.timer.metrics()
    }

    pub fn query_str(&self) -> Option<&str> {
        self.ctx.query_str.as_deref()
    }
}

impl<'g, T: Timer> SearchPipeline<'g, InitialState, T> {
    /// Parse a search string. Qualified tags resolve against the gallery's
    /// own hierarchy.
    pub fn parse(
        self,
        parser: &SearchParser<'_, TagTree>,
        query_str: &str,
    ) -> Result<SearchPipeline<'g, ParsedState, T>, SearchError> {
        let SearchPipeline {
            mut ctx,
            state: InitialState,
            mut timer,
        } = self;

        let query = timer.measure(Stage::Parse, || parser.parse(query_str))?;
        ctx.query_str = Some(query_str.to_owned());

        Ok(SearchPipeline {
            ctx,
            state: ParsedState { query },
            timer,
        })
    }

    /// Use a pre-parsed query.
    pub fn with_query(self, query: Query) -> SearchPipeline<'g, ParsedState, T> {
        let SearchPipeline {
            ctx,
            state: InitialState,
            timer,
        } = self;

        SearchPipeline {
            ctx,
            state: ParsedState { query },
            timer,
        }
    }
}

impl<'g, T: Timer> SearchPipeline<'g, ParsedState, T> {
    pub fn execute(self) -> SearchPipeline<'g, ExecutedState, T> {
        let SearchPipeline {
            ctx,
            state: ParsedState { query },
            mut timer,
        } = self;

        let hits = timer.measure(Stage::Exec, || {
            query
                .apply(Selection::visible(ctx.gallery, &ctx.viewer))
                .into_ids()
        });
        debug!("{} matches for {}", hits.len(), query.predicate);

        SearchPipeline {
            ctx,
            state: ExecutedState { query, hits },
            timer,
        }
    }

    pub fn query(&self) -> &Query {
        &self.state.query
    }
}

impl<'g, T: Timer> SearchPipeline<'g, ExecutedState, T> {
    /// Order hits newest-created first, ties broken by ascending id, and
    /// keep at most `limit`.
    pub fn order(self, limit: Option<usize>) -> SearchPipeline<'g, OrderedState, T> {
        let SearchPipeline {
            mut ctx,
            state: ExecutedState { query: _, hits },
            mut timer,
        } = self;

        ctx.result_total = hits.len();
        let gallery = ctx.gallery;

        let results = timer.measure(Stage::Order, || {
            let mut keyed: Vec<_> = hits
                .into_iter()
                .filter_map(|id| gallery.get(id).map(|p| (Reverse(p.created), id)))
                .collect();
            keyed.sort_unstable();
            if let Some(limit) = limit {
                keyed.truncate(limit);
            }
            keyed.into_iter().map(|(_, id)| id).collect()
        });

        SearchPipeline {
            ctx,
            state: OrderedState { results },
            timer,
        }
    }

    pub fn hits(&self) -> &[PictureId] {
        &self.state.hits
    }

    pub fn query(&self) -> &Query {
        &self.state.query
    }
}

impl<'g, T: Timer> SearchPipeline<'g, OrderedState, T> {
    pub fn results(&self) -> &[PictureId] {
        &self.state.results
    }

    pub fn into_results(self) -> Vec<PictureId> {
        self.state.results
    }

    /// Matches before the limit, not just the number kept.
    pub fn count(&self) -> usize {
        self.ctx.result_total
    }

    /// Results with their 1-based rank.
    pub fn iter_pictures(&self) -> impl Iterator<Item = (usize, &'g Picture)> + '_ {
        let gallery = self.ctx.gallery;
        self.state
            .results
            .iter()
            .filter_map(move |&id| gallery.get(id))
            .enumerate()
            .map(|(i, picture)| (i + 1, picture))
    }
}

#[derive(Debug, Clone)]
pub struct SearchHit<'g> {
    pub rank: usize,
    pub picture: &'g Picture,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome<'g> {
    /// Top hits, newest first.
    pub hits: Vec<SearchHit<'g>>,
    /// Matches before the limit.
    pub total: usize,
    pub metrics: SearchMetrics,
    pub query: Query,
}

/// Parse `query_str`, run it for `viewer` and return up to `limit` hits.
pub fn search<'g>(
    gallery: &'g Gallery,
    viewer: Viewer,
    parser: &SearchParser<'_, TagTree>,
    query_str: &str,
    limit: usize,
) -> Result<SearchOutcome<'g>, SearchError> {
    let executed = SearchPipeline::<_, MetricsTimer>::new(gallery, viewer)
        .parse(parser, query_str)?
        .execute();
    let query = executed.query().clone();
    let pipeline = executed.order(Some(limit));

    let hits = pipeline
        .iter_pictures()
        .map(|(rank, picture)| SearchHit { rank, picture })
        .collect();

    Ok(SearchOutcome {
        hits,
        total: pipeline.count(),
        metrics: pipeline.metrics().cloned().unwrap_or_default(),
        query,
    })
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
