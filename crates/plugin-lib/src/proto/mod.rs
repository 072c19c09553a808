//! CostSource wire types and gRPC service plumbing
//!
//! Messages are declared with prost derives and the server side is written
//! out by hand in the shape tonic's code generator produces, so the crate
//! builds without protoc.

pub mod costsource {
    pub mod v1 {
        use prost::Message;
        use std::collections::HashMap;

        #[derive(Clone, PartialEq, Message)]
        pub struct NameRequest {}

        #[derive(Clone, PartialEq, Message)]
        pub struct NameResponse {
            #[prost(string, tag = "1")]
            pub name: String,
        }

        /// A cloud or cluster resource as the host describes it
        #[derive(Clone, PartialEq, Message)]
        pub struct ResourceDescriptor {
            #[prost(string, tag = "1")]
            pub provider: String,
            #[prost(string, tag = "2")]
            pub resource_type: String,
            #[prost(string, tag = "3")]
            pub sku: String,
            #[prost(string, tag = "4")]
            pub region: String,
            #[prost(map = "string, string", tag = "5")]
            pub tags: HashMap<String, String>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct SupportsRequest {
            #[prost(message, optional, tag = "1")]
            pub resource: Option<ResourceDescriptor>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct SupportsResponse {
            #[prost(bool, tag = "1")]
            pub supported: bool,
            #[prost(string, tag = "2")]
            pub reason: String,
        }

        /// Start and end are RFC3339 strings; either may be empty
        #[derive(Clone, PartialEq, Message)]
        pub struct GetActualCostRequest {
            #[prost(string, tag = "1")]
            pub resource_id: String,
            #[prost(string, tag = "2")]
            pub start: String,
            #[prost(string, tag = "3")]
            pub end: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ActualCostResult {
            #[prost(message, optional, tag = "1")]
            pub timestamp: Option<prost_types::Timestamp>,
            #[prost(double, tag = "2")]
            pub cost: f64,
            #[prost(double, tag = "3")]
            pub usage_amount: f64,
            #[prost(string, tag = "4")]
            pub usage_unit: String,
            #[prost(string, tag = "5")]
            pub source: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct GetActualCostResponse {
            #[prost(message, repeated, tag = "1")]
            pub results: Vec<ActualCostResult>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct GetProjectedCostRequest {
            #[prost(message, optional, tag = "1")]
            pub resource: Option<ResourceDescriptor>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct GetProjectedCostResponse {
            #[prost(double, tag = "1")]
            pub unit_price: f64,
            #[prost(string, tag = "2")]
            pub currency: String,
            #[prost(double, tag = "3")]
            pub cost_per_month: f64,
            #[prost(string, tag = "4")]
            pub billing_detail: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct GetPricingSpecRequest {
            #[prost(message, optional, tag = "1")]
            pub resource: Option<ResourceDescriptor>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct PricingSpec {
            #[prost(string, tag = "1")]
            pub provider: String,
            #[prost(string, tag = "2")]
            pub resource_type: String,
            #[prost(string, tag = "3")]
            pub sku: String,
            #[prost(string, tag = "4")]
            pub region: String,
            #[prost(string, tag = "5")]
            pub billing_mode: String,
            #[prost(double, tag = "6")]
            pub rate_per_unit: f64,
            #[prost(string, tag = "7")]
            pub currency: String,
            #[prost(string, tag = "8")]
            pub description: String,
            #[prost(map = "string, string", tag = "9")]
            pub plugin_metadata: HashMap<String, String>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct GetPricingSpecResponse {
            #[prost(message, optional, tag = "1")]
            pub spec: Option<PricingSpec>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct PredictSpecCostRequest {
            #[prost(string, tag = "1")]
            pub cluster_id: String,
            #[prost(string, tag = "2")]
            pub default_namespace: String,
            #[prost(string, tag = "3")]
            pub window: String,
            #[prost(bool, tag = "4")]
            pub no_usage: bool,
            #[prost(string, tag = "5")]
            pub workload_spec: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct PredictSpecCostResponse {
            #[prost(string, tag = "1")]
            pub cost_before: String,
            #[prost(string, tag = "2")]
            pub cost_after: String,
            #[prost(string, tag = "3")]
            pub cost_change: String,
        }

        pub mod cost_source_server {
            use super::*;
            use tonic::codegen::*;

            pub const SERVICE_NAME: &str = "costsource.v1.CostSource";

            #[async_trait]
            pub trait CostSource: Send + Sync + 'static {
                async fn name(
                    &self,
                    request: tonic::Request<NameRequest>,
                ) -> std::result::Result<tonic::Response<NameResponse>, tonic::Status>;

                async fn supports(
                    &self,
                    request: tonic::Request<SupportsRequest>,
                ) -> std::result::Result<tonic::Response<SupportsResponse>, tonic::Status>;

                async fn get_actual_cost(
                    &self,
                    request: tonic::Request<GetActualCostRequest>,
                ) -> std::result::Result<tonic::Response<GetActualCostResponse>, tonic::Status>;

                async fn get_projected_cost(
                    &self,
                    request: tonic::Request<GetProjectedCostRequest>,
                ) -> std::result::Result<tonic::Response<GetProjectedCostResponse>, tonic::Status>;

                async fn get_pricing_spec(
                    &self,
                    request: tonic::Request<GetPricingSpecRequest>,
                ) -> std::result::Result<tonic::Response<GetPricingSpecResponse>, tonic::Status>;

                async fn predict_spec_cost(
                    &self,
                    request: tonic::Request<PredictSpecCostRequest>,
                ) -> std::result::Result<tonic::Response<PredictSpecCostResponse>, tonic::Status>;
            }

            #[derive(Debug)]
            pub struct CostSourceServer<T: CostSource> {
                inner: Arc<T>,
            }

            impl<T: CostSource> CostSourceServer<T> {
                pub fn new(inner: T) -> Self {
                    Self::from_arc(Arc::new(inner))
                }

                pub fn from_arc(inner: Arc<T>) -> Self {
                    Self { inner }
                }
            }

            impl<T: CostSource> Clone for CostSourceServer<T> {
                fn clone(&self) -> Self {
                    Self {
                        inner: Arc::clone(&self.inner),
                    }
                }
            }

            /// Route one unary method to the matching trait function
            macro_rules! unary_route {
                ($inner:expr, $req:expr, $method:ident, $request:ty, $response:ty) => {{
                    struct MethodSvc<T: CostSource>(Arc<T>);

                    impl<T: CostSource> tonic::server::UnaryService<$request> for MethodSvc<T> {
                        type Response = $response;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;

                        fn call(&mut self, request: tonic::Request<$request>) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            Box::pin(async move { inner.$method(request).await })
                        }
                    }

                    let method = MethodSvc($inner);
                    let req = $req;
                    Box::pin(async move {
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec);
                        Ok(grpc.unary(method, req).await)
                    })
                }};
            }

            impl<T, B> tonic::codegen::Service<http::Request<B>> for CostSourceServer<T>
            where
                T: CostSource,
                B: Body + Send + 'static,
                B::Error: Into<StdError> + Send + 'static,
            {
                type Response = http::Response<tonic::body::BoxBody>;
                type Error = std::convert::Infallible;
                type Future = BoxFuture<Self::Response, Self::Error>;

                fn poll_ready(
                    &mut self,
                    _cx: &mut Context<'_>,
                ) -> Poll<std::result::Result<(), Self::Error>> {
                    Poll::Ready(Ok(()))
                }

                fn call(&mut self, req: http::Request<B>) -> Self::Future {
                    let inner = Arc::clone(&self.inner);
                    match req.uri().path() {
                        "/costsource.v1.CostSource/Name" => {
                            unary_route!(inner, req, name, NameRequest, NameResponse)
                        }
                        "/costsource.v1.CostSource/Supports" => {
                            unary_route!(inner, req, supports, SupportsRequest, SupportsResponse)
                        }
                        "/costsource.v1.CostSource/GetActualCost" => unary_route!(
                            inner,
                            req,
                            get_actual_cost,
                            GetActualCostRequest,
                            GetActualCostResponse
                        ),
                        "/costsource.v1.CostSource/GetProjectedCost" => unary_route!(
                            inner,
                            req,
                            get_projected_cost,
                            GetProjectedCostRequest,
                            GetProjectedCostResponse
                        ),
                        "/costsource.v1.CostSource/GetPricingSpec" => unary_route!(
                            inner,
                            req,
                            get_pricing_spec,
                            GetPricingSpecRequest,
                            GetPricingSpecResponse
                        ),
                        "/costsource.v1.CostSource/PredictSpecCost" => unary_route!(
                            inner,
                            req,
                            predict_spec_cost,
                            PredictSpecCostRequest,
                            PredictSpecCostResponse
                        ),
                        _ => Box::pin(async move {
                            let mut response = http::Response::new(empty_body());
                            let headers = response.headers_mut();
                            headers.insert(
                                "grpc-status",
                                http::HeaderValue::from(tonic::Code::Unimplemented as i32),
                            );
                            headers.insert(
                                http::header::CONTENT_TYPE,
                                http::HeaderValue::from_static("application/grpc"),
                            );
                            Ok(response)
                        }),
                    }
                }
            }

            impl<T: CostSource> tonic::server::NamedService for CostSourceServer<T> {
                const NAME: &'static str = SERVICE_NAME;
            }
        }
    }
}

pub use costsource::v1::cost_source_server::{CostSource, CostSourceServer};
pub use costsource::v1::*;
