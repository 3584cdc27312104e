//! Space settings and recommended limits

use sbx_api::{Client, RequestContext, SpaceId, SpaceOptions};
use sbx_limiter::LimiterConfig;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct SpaceInfo {
    pub options: SpaceOptions,
    /// Limits suited to the space's plan level
    pub recommended: LimiterConfig,
}

/// Fetch a space's settings along with the limits recommended for its plan
pub async fn info(client: &Client, ctx: &RequestContext, space: SpaceId) -> Result<SpaceInfo> {
    if space == 0 {
        return Err(Error::InvalidSpace { space });
    }
    let options = client.get_space(ctx, space).await?;
    let recommended = LimiterConfig::for_plan(options.plan_level);
    Ok(SpaceInfo { options, recommended })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbx_test_utils::{FakeSpace, client_for};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_free_plan_gets_tighter_limits() {
        let space = Arc::new(FakeSpace::new(9).with_plan_level(0));
        let info = info(&client_for(&space), &RequestContext::new(), 9).await.unwrap();
        assert_eq!(info.options.id, 9);
        assert_eq!(info.recommended, LimiterConfig::for_plan(0));
        assert_eq!(info.recommended.write_rps, 3.0);
    }

    #[tokio::test]
    async fn test_zero_space_rejected_without_request() {
        let space = Arc::new(FakeSpace::new(9));
        let err = info(&client_for(&space), &RequestContext::new(), 0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidSpace { .. }));
        assert!(space.calls().is_empty());
    }
}
