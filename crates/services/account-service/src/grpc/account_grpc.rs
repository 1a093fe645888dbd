//! gRPC implementation for AccountService.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use uuid::Uuid;

use domain::{RoleMode, User, UserParams, UserRelation};

use crate::service::UserService;
use proto::account::{
    account_service_server::AccountService as AccountServiceProto, AttachRolesRequest,
    CreateUserRequest, DeleteUsersRequest, DeleteUsersResponse, DetachRolesRequest,
    FindUserRequest, PermissionsRequest, Role as RoleProto, RoleCountResponse,
    RoleMode as ProtoRoleMode, SocialProfile as SocialProfileProto,
    Subscription as SubscriptionProto, UpdateUserRequest, User as UserProto,
    UserParams as UserParamsProto,
};

/// gRPC service wrapper for UserService.
pub struct AccountGrpcService {
    service: Arc<dyn UserService>,
}

impl AccountGrpcService {
    /// Create a new gRPC service wrapper.
    pub fn new(service: Arc<dyn UserService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl AccountServiceProto for AccountGrpcService {
    async fn find_user(
        &self,
        request: Request<FindUserRequest>,
    ) -> Result<Response<UserProto>, Status> {
        let req = request.into_inner();
        let id = parse_uuid(&req.id)?;
        let relations = req
            .relations
            .iter()
            .map(|r| r.parse::<UserRelation>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        let user = self
            .service
            .find_or_fail(id, &relations)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(user_to_proto(&user)))
    }

    async fn first_or_create_user(
        &self,
        request: Request<CreateUserRequest>,
    ) -> Result<Response<UserProto>, Status> {
        let params = params_from_proto(request.into_inner().params)?;

        let user = self
            .service
            .first_or_create(params)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(user_to_proto(&user)))
    }

    async fn create_user(
        &self,
        request: Request<CreateUserRequest>,
    ) -> Result<Response<UserProto>, Status> {
        let params = params_from_proto(request.into_inner().params)?;

        let user = self.service.create(params).await.map_err(Status::from)?;
        Ok(Response::new(user_to_proto(&user)))
    }

    async fn update_user(
        &self,
        request: Request<UpdateUserRequest>,
    ) -> Result<Response<UserProto>, Status> {
        let req = request.into_inner();
        let id = parse_uuid(&req.id)?;
        let params = params_from_proto(req.params)?;

        let user = self.service.update(id, params).await.map_err(Status::from)?;
        Ok(Response::new(user_to_proto(&user)))
    }

    async fn delete_users(
        &self,
        request: Request<DeleteUsersRequest>,
    ) -> Result<Response<DeleteUsersResponse>, Status> {
        let ids = parse_uuids(&request.into_inner().ids)?;

        let deleted = self
            .service
            .delete_multiple(&ids)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(DeleteUsersResponse { deleted }))
    }

    async fn attach_roles(
        &self,
        request: Request<AttachRolesRequest>,
    ) -> Result<Response<RoleCountResponse>, Status> {
        let req = request.into_inner();
        let user_id = parse_uuid(&req.user_id)?;
        let role_ids = parse_uuids(&req.role_ids)?;
        let mode = match req.mode() {
            ProtoRoleMode::Attach => RoleMode::Attach,
            ProtoRoleMode::Detach => RoleMode::Detach,
            ProtoRoleMode::Sync | ProtoRoleMode::Unspecified => RoleMode::Sync,
        };

        let affected = self
            .service
            .attach_roles(user_id, &role_ids, mode)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(RoleCountResponse { affected }))
    }

    async fn detach_roles(
        &self,
        request: Request<DetachRolesRequest>,
    ) -> Result<Response<RoleCountResponse>, Status> {
        let req = request.into_inner();
        let user_id = parse_uuid(&req.user_id)?;
        let role_ids = parse_uuids(&req.role_ids)?;

        let affected = self
            .service
            .detach_roles(user_id, &role_ids)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(RoleCountResponse { affected }))
    }

    async fn add_permissions(
        &self,
        request: Request<PermissionsRequest>,
    ) -> Result<Response<UserProto>, Status> {
        let req = request.into_inner();
        let user_id = parse_uuid(&req.user_id)?;

        let user = self
            .service
            .add_permissions(user_id, &req.names)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(user_to_proto(&user)))
    }

    async fn remove_permissions(
        &self,
        request: Request<PermissionsRequest>,
    ) -> Result<Response<UserProto>, Status> {
        let req = request.into_inner();
        let user_id = parse_uuid(&req.user_id)?;

        let user = self
            .service
            .remove_permissions(user_id, &req.names)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(user_to_proto(&user)))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_uuid(s: &str) -> Result<Uuid, Status> {
    Uuid::parse_str(s).map_err(|_| Status::invalid_argument(format!("Invalid id: {}", s)))
}

fn parse_uuids(ids: &[String]) -> Result<Vec<Uuid>, Status> {
    ids.iter().map(|id| parse_uuid(id)).collect()
}

fn params_from_proto(params: Option<UserParamsProto>) -> Result<UserParams, Status> {
    let p = params.unwrap_or_default();

    let roles = match p.roles {
        Some(list) => Some(parse_uuids(&list.ids)?),
        None => None,
    };

    Ok(UserParams {
        email: p.email,
        password: p.password,
        username: p.username,
        first_name: p.first_name,
        last_name: p.last_name,
        language: p.language,
        country: p.country,
        timezone: p.timezone,
        confirmed: p.confirmed,
        confirmation_code: p.confirmation_code,
        available_space: p.available_space.map(|space| space.bytes),
        roles,
        permissions: p.permissions.map(|list| list.names),
    })
}

fn user_to_proto(user: &User) -> UserProto {
    UserProto {
        id: user.id.to_string(),
        email: user.email.clone(),
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        language: user.language.clone(),
        country: user.country.clone(),
        timezone: user.timezone.clone(),
        confirmed: user.confirmed,
        available_space: user.available_space,
        permissions: user
            .permissions
            .iter()
            .map(|(name, granted)| (name.to_string(), granted))
            .collect(),
        roles: user
            .roles
            .iter()
            .flatten()
            .map(|role| RoleProto {
                id: role.id.to_string(),
                name: role.name.clone(),
                description: role.description.clone(),
                is_default: role.is_default,
            })
            .collect(),
        social_profiles: user
            .social_profiles
            .iter()
            .flatten()
            .map(|profile| SocialProfileProto {
                id: profile.id.to_string(),
                service_name: profile.service_name.clone(),
                user_service_id: profile.user_service_id.clone(),
            })
            .collect(),
        subscriptions: user
            .subscriptions
            .iter()
            .flatten()
            .map(|sub| SubscriptionProto {
                id: sub.id.to_string(),
                gateway: sub.gateway.clone(),
                gateway_id: sub.gateway_id.clone(),
                plan_id: sub.plan_id.map(|id| id.to_string()),
                ends_at: sub.ends_at.map(|t| t.to_rfc3339()),
                cancelled_at: sub.cancelled_at.map(|t| t.to_rfc3339()),
            })
            .collect(),
        has_password: user.has_password(),
        created_at: user.created_at.to_rfc3339(),
        updated_at: user.updated_at.to_rfc3339(),
    }
}
