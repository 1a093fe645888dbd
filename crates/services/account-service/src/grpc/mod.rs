//! gRPC transport for the account service.

mod account_grpc;

pub use account_grpc::AccountGrpcService;
