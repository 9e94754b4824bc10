use std::collections::HashSet;
use std::sync::Arc;
use std::task::Poll;

use async_graphql_value::{ConstValue, Name};
use futures::stream::{FuturesUnordered, StreamExt};
use indexmap::IndexMap;
use tokio::time::Instant;

use crate::batch::BoxFuture;
use crate::context::{FieldResolution, RequestContext};
use crate::error::{Error, Result};
use crate::resolver::Resolver;
use crate::schema::{Arguments, FieldDef};

/// A schema field bound to its resolver.
pub struct FieldPlan {
    pub field: FieldDef,
    pub resolver: Arc<dyn Resolver>,
}

impl FieldPlan {
    pub fn new(field: FieldDef, resolver: Arc<dyn Resolver>) -> Arc<Self> {
        Arc::new(Self { field, resolver })
    }
}

/// One requested field: alias, plan, parent object, externally-named
/// arguments, and the pre-computed complexity of its selection subtree.
pub struct FieldInvocation {
    pub alias: String,
    pub plan: Arc<FieldPlan>,
    pub parent: Option<ConstValue>,
    pub arguments: IndexMap<Name, ConstValue>,
    pub child_complexity: usize,
}

impl FieldInvocation {
    pub fn new(alias: impl Into<String>, plan: Arc<FieldPlan>) -> Self {
        Self {
            alias: alias.into(),
            plan,
            parent: None,
            arguments: IndexMap::new(),
            child_complexity: 0,
        }
    }

    pub fn with_parent(mut self, parent: ConstValue) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_argument(mut self, external_name: &str, value: ConstValue) -> Self {
        self.arguments.insert(Name::new(external_name), value);
        self
    }

    pub fn with_child_complexity(mut self, child_complexity: usize) -> Self {
        self.child_complexity = child_complexity;
        self
    }
}

pub type FieldOutcome = std::result::Result<ConstValue, Error>;

/// Drives all field resolutions of one request on a single logical task.
///
/// Sibling fields interleave cooperatively: whenever every in-flight path
/// is suspended on unresolved lazy values, the coordinator flushes exactly
/// one wave and resumption continues. No work crosses request boundaries.
pub struct Executor {
    ctx: RequestContext,
}

impl Executor {
    pub fn new(ctx: RequestContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    /// Resolve a set of fields. Admission control runs first: every field
    /// is scored and the whole request is rejected if the accumulated cost
    /// exceeds the budget, before any resolver body executes.
    ///
    /// Per-field failures (bad arguments, missing resources, backend
    /// errors, deadline expiry) land in that field's slot; fields that
    /// already resolved keep their values.
    pub async fn execute(
        &self,
        invocations: Vec<FieldInvocation>,
    ) -> Result<IndexMap<String, FieldOutcome>> {
        let mut results: IndexMap<String, FieldOutcome> = IndexMap::new();

        let mut planned: Vec<(String, Arc<FieldPlan>, Option<ConstValue>, Arguments)> = Vec::new();
        for invocation in invocations {
            let coerced = invocation
                .plan
                .field
                .coerce_arguments(&invocation.arguments, self.ctx.features());
            match coerced {
                Ok(args) => {
                    let score = match invocation.plan.field.complexity_override {
                        Some(cost) => cost,
                        None => invocation.plan.resolver.complexity(
                            &args,
                            invocation.child_complexity,
                            invocation.plan.field.max_page_size,
                        ),
                    };
                    self.ctx.complexity().add(score)?;
                    planned.push((invocation.alias, invocation.plan, invocation.parent, args));
                }
                Err(err) => {
                    results.insert(invocation.alias, Err(err));
                }
            }
        }

        let mut in_flight: HashSet<String> = planned.iter().map(|(a, ..)| a.clone()).collect();
        let mut fields: FuturesUnordered<BoxFuture<'_, (String, FieldOutcome)>> =
            FuturesUnordered::new();
        for (alias, plan, parent, args) in planned {
            let ctx = &self.ctx;
            fields.push(Box::pin(async move {
                let outcome = resolve_one(ctx, &plan, parent.as_ref(), args).await;
                (alias, outcome)
            }));
        }

        loop {
            if deadline_expired(&self.ctx) {
                fail_pending(&mut results, &in_flight);
                break;
            }
            match futures::poll!(fields.next()) {
                Poll::Ready(Some((alias, outcome))) => {
                    in_flight.remove(&alias);
                    results.insert(alias, outcome);
                }
                Poll::Ready(None) => break,
                Poll::Pending => {
                    if self.ctx.batch().has_pending() {
                        if !self.flush_within_deadline().await {
                            tracing::warn!(
                                pending = in_flight.len(),
                                "request deadline reached during batch flush"
                            );
                            fail_pending(&mut results, &in_flight);
                            break;
                        }
                        continue;
                    }
                    // Every path is waiting on a collaborator future, not
                    // on a wave; await the next completion directly.
                    let next = match self.ctx.deadline() {
                        Some(deadline) => {
                            match tokio::time::timeout_at(deadline, fields.next()).await {
                                Ok(next) => next,
                                Err(_) => {
                                    tracing::warn!(
                                        pending = in_flight.len(),
                                        "request deadline reached"
                                    );
                                    fail_pending(&mut results, &in_flight);
                                    break;
                                }
                            }
                        }
                        None => fields.next().await,
                    };
                    match next {
                        Some((alias, outcome)) => {
                            in_flight.remove(&alias);
                            results.insert(alias, outcome);
                        }
                        None => break,
                    }
                }
            }
        }

        Ok(results)
    }

    /// Flush the pending wave, giving up at the request deadline so a hung
    /// bulk-fetch collaborator cannot stall the request past it. Returns
    /// whether the flush ran to completion.
    async fn flush_within_deadline(&self) -> bool {
        match self.ctx.deadline() {
            Some(deadline) => tokio::time::timeout_at(deadline, self.ctx.batch().flush())
                .await
                .is_ok(),
            None => {
                self.ctx.batch().flush().await;
                true
            }
        }
    }

    /// Convenience wrapper for resolving one field.
    pub async fn resolve_field(
        &self,
        plan: Arc<FieldPlan>,
        parent: Option<ConstValue>,
        arguments: IndexMap<Name, ConstValue>,
    ) -> FieldOutcome {
        let mut invocation = FieldInvocation::new("field", plan);
        invocation.parent = parent;
        invocation.arguments = arguments;
        let mut results = self.execute(vec![invocation]).await?;
        match results.shift_remove("field") {
            Some(outcome) => outcome,
            None => unreachable!("executed invocation always yields an outcome"),
        }
    }
}

fn deadline_expired(ctx: &RequestContext) -> bool {
    ctx.deadline().is_some_and(|d| Instant::now() >= d)
}

fn fail_pending(results: &mut IndexMap<String, FieldOutcome>, in_flight: &HashSet<String>) {
    for alias in in_flight {
        results.insert(
            alias.clone(),
            Err(Error::Timeout {
                field: alias.clone(),
            }),
        );
    }
}

async fn resolve_one(
    ctx: &RequestContext,
    plan: &FieldPlan,
    parent: Option<&ConstValue>,
    args: Arguments,
) -> FieldOutcome {
    plan.resolver.validate(&args)?;
    let resolution = FieldResolution {
        parent,
        args,
        ctx,
        field: &plan.field,
    };
    let resolved = plan.resolver.resolve(&resolution).await?;
    resolved.into_value().await
}
