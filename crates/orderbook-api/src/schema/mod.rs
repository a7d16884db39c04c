mod parse;
pub mod query;
pub mod types;

use async_graphql::{EmptyMutation, EmptySubscription, Schema};
use orderbook_core::calls::OrderCalls;
use orderbook_oracle::PriceUpdateClient;
use orderbook_store::BookStore;
use orderbook_sync::{TokenReader, TradeLookup};
use std::sync::Arc;

pub use query::QueryRoot;

/// GraphQL Schema type
pub type ApiSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

/// Context shared across GraphQL resolvers
pub struct ApiContext {
    pub store: Arc<BookStore>,
    pub calls: OrderCalls,
    /// Unset when no price service is configured
    pub oracle: Option<PriceUpdateClient>,
    /// Unset when no chain connection is available
    pub tokens: Option<TokenReader>,
    /// Chain backfill for user histories past the retained window
    pub history: Option<TradeLookup>,
}

impl ApiContext {
    pub fn new(store: Arc<BookStore>, calls: OrderCalls) -> Self {
        Self {
            store,
            calls,
            oracle: None,
            tokens: None,
            history: None,
        }
    }

    pub fn with_oracle(mut self, oracle: Option<PriceUpdateClient>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_tokens(mut self, tokens: TokenReader) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_history(mut self, history: TradeLookup) -> Self {
        self.history = Some(history);
        self
    }
}

/// Build the GraphQL schema
pub fn build_schema(ctx: ApiContext) -> ApiSchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(ctx.store)
        .data(ctx.calls)
        .data(ctx.oracle)
        .data(ctx.tokens)
        .data(ctx.history)
        .finish()
}
