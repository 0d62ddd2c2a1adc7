//! 数据传输对象
//!
//! 包含所有请求和响应的数据传输对象

pub mod request;
pub mod response;

pub use request::{
    ActivityQuery, AlertQuery, CollectionQuery, CollectorQuery, CreateAlertRequest,
    CreateCollectorRequest, CreateMetricRequest, CreateMunicipalityRequest, CreateReportRequest,
    CreateRewardRequest, CreateUserRequest, CreateZoneRequest, IssueCardRequest, LoginRequest,
    MetricQuery, MunicipalityFilterQuery, PaginationParams, RegisterRequest, RewardQuery,
    RfidCardQuery, SensorQuery, SensorReadingRequest, TransactionQuery,
    UpdateCollectorStatusRequest, UpdateUserRequest, UserQuery, VerifyCollectionRequest,
};
pub use response::{
    ApiResponse, CancellationResponse, DeletedResponse, LoginResponse, PageResponse,
    RefreshResponse, RegisterResponse,
};
