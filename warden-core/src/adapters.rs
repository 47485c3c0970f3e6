/// Implement `WardenService` by forwarding to inherent `_find`, `_get`,
/// `_count`, `_create`, `_update`, `_patch` and `_remove` methods, with
/// the service's capabilities read from a `capabilities` field.
///
/// Generic adapters pass their impl generics in brackets:
///
/// ```ignore
/// warden_core::warden_adapter!([R: warden_core::Model, P: Send + 'static] MemoryService<R>, R, P);
/// ```
#[macro_export]
macro_rules! warden_adapter {
    ([$($generics:tt)*] $ty:ty, $req:ty, $params:ty) => {
        #[async_trait::async_trait]
        impl<$($generics)*> $crate::WardenService<$req, $params> for $ty {
            fn capabilities(&self) -> $crate::ServiceCapabilities {
                self.capabilities.clone()
            }

            async fn find(
                &self,
                ctx: &$crate::CallContext,
                query: &$crate::Query,
                params: $params,
            ) -> anyhow::Result<Vec<$req>> {
                self._find(ctx, query, params).await
            }

            async fn get(
                &self,
                ctx: &$crate::CallContext,
                id: &str,
                query: &$crate::Query,
                params: $params,
            ) -> anyhow::Result<$req> {
                self._get(ctx, id, query, params).await
            }

            async fn count(
                &self,
                ctx: &$crate::CallContext,
                query: &$crate::Query,
                params: $params,
            ) -> anyhow::Result<usize> {
                self._count(ctx, query, params).await
            }

            async fn create(
                &self,
                ctx: &$crate::CallContext,
                data: $crate::Records<$req>,
                params: $params,
            ) -> anyhow::Result<$crate::Records<$req>> {
                self._create(ctx, data, params).await
            }

            async fn update(
                &self,
                ctx: &$crate::CallContext,
                id: &str,
                data: $req,
                query: &$crate::Query,
                params: $params,
            ) -> anyhow::Result<$req> {
                self._update(ctx, id, data, query, params).await
            }

            async fn patch(
                &self,
                ctx: &$crate::CallContext,
                id: Option<&str>,
                changes: $crate::Changes,
                query: &$crate::Query,
                params: $params,
            ) -> anyhow::Result<Vec<$req>> {
                self._patch(ctx, id, changes, query, params).await
            }

            async fn remove(
                &self,
                ctx: &$crate::CallContext,
                id: Option<&str>,
                query: &$crate::Query,
                params: $params,
            ) -> anyhow::Result<Vec<$req>> {
                self._remove(ctx, id, query, params).await
            }
        }
    };
    ($ty:ty, $req:ty, $params:ty) => {
        $crate::warden_adapter!([] $ty, $req, $params);
    };
}
