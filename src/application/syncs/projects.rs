//! Project endpoints expressed as synchronizations.
//!
//! `POST /api/projects` is only honored for callers (identified by the
//! `x-user-id` header) holding an accepted membership of the target team.
//! Everyone else gets a 403 and no project is created. A member whose
//! project is rejected (for instance without a `name`) gets a 422.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::application::engine::ConceptHandle;
use crate::domain::sync::{sync, Frames, SyncDeclaration, SyncFactory, Vars};
use crate::{actions, fields};

use super::lookup;

const PROJECTS_PATH: &str = "/api/projects";
const USER_HEADER: &str = "x-user-id";

pub fn project_syncs(
    api: &ConceptHandle,
    membership: &ConceptHandle,
    project: &ConceptHandle,
) -> Vec<(&'static str, SyncFactory)> {
    let request = api.action("request");
    let respond = api.action("respond");
    let create = project.action("create");
    let by_member_and_target = membership.query_ref("_getByMemberAndTarget");

    vec![
        ("CreateProject", {
            let (request, create) = (request.clone(), create.clone());
            let memberships = by_member_and_target.clone();
            sync(move |vars: &mut Vars| {
                let team = vars.var("team");
                let body = vars.var("body");
                let name = vars.var("name");
                let headers = vars.var("headers");
                let user = vars.var("user");
                let membership = vars.var("membership");
                let project = vars.var("project");
                let derived = (
                    team.clone(),
                    body.clone(),
                    name.clone(),
                    headers.clone(),
                    user.clone(),
                    membership,
                    project.clone(),
                );

                SyncDeclaration::when(actions![(
                    request,
                    fields! {
                        "method" => "POST",
                        "path" => PROJECTS_PATH,
                        "team" => &team,
                        "body" => &body,
                        "headers" => &headers,
                    }
                )])
                .where_async(move |frames: Frames| {
                    let memberships = memberships.clone();
                    let (team, body, name, headers, user, membership, project) = derived.clone();
                    async move {
                        // a missing name still reaches Project.create so the error gets answered
                        let identified: Frames = frames
                            .into_iter()
                            .filter_map(|frame| {
                                let id = lookup(&frame, &headers, USER_HEADER)?;
                                let given_name = lookup(&frame, &body, "name").unwrap_or(Value::Null);
                                Some(frame.with(&user, id).with(&name, given_name))
                            })
                            .collect();
                        let members = memberships
                            .join(
                                identified,
                                &fields! { "member" => &user, "target" => &team },
                                &fields! { "membership" => &membership, "status" => "accepted" },
                            )
                            .await;
                        Ok(members.map(|frame| frame.with(&project, Uuid::new_v4().to_string())))
                    }
                })
                .then(actions![(
                    create,
                    fields! { "project" => &project, "team" => &team, "name" => &name }
                )])
            })
        }),
        ("CreateProjectResponse", {
            let (request, create, respond) = (request.clone(), create.clone(), respond.clone());
            sync(move |vars: &mut Vars| {
                let req = vars.var("request");
                let project = vars.var("project");
                SyncDeclaration::when(actions![
                    (
                        request,
                        fields! { "method" => "POST", "path" => PROJECTS_PATH },
                        fields! { "request" => &req }
                    ),
                    (create, fields! {}, fields! { "project" => &project }),
                ])
                .then(actions![(
                    respond,
                    fields! { "request" => &req, "status" => 201, "body" => &project }
                )])
            })
        }),
        ("CreateProjectError", {
            let (request, create, respond) = (request.clone(), create.clone(), respond.clone());
            sync(move |vars: &mut Vars| {
                let req = vars.var("request");
                let error = vars.var("error");
                let body = vars.var("body");
                let derived = (error.clone(), body.clone());
                SyncDeclaration::when(actions![
                    (
                        request,
                        fields! { "method" => "POST", "path" => PROJECTS_PATH },
                        fields! { "request" => &req }
                    ),
                    (create, fields! {}, fields! { "error" => &error }),
                ])
                .where_fn(move |frames: Frames| {
                    let (error, body) = &derived;
                    Ok(frames.map(|frame| {
                        let message = frame.get(error).cloned().unwrap_or(Value::Null);
                        frame.with(body, json!({ "error": message }))
                    }))
                })
                .then(actions![(
                    respond,
                    fields! { "request" => &req, "status" => 422, "body" => &body }
                )])
            })
        }),
        ("CreateProjectForbidden", {
            let memberships = by_member_and_target;
            sync(move |vars: &mut Vars| {
                let req = vars.var("request");
                let team = vars.var("team");
                let headers = vars.var("headers");
                let user = vars.var("user");
                let membership = vars.var("membership");
                let body = vars.var("body");
                let derived = (team.clone(), headers.clone(), user, membership, body.clone());

                SyncDeclaration::when(actions![(
                    request,
                    fields! {
                        "method" => "POST",
                        "path" => PROJECTS_PATH,
                        "team" => &team,
                        "headers" => &headers,
                    },
                    fields! { "request" => &req }
                )])
                .where_async(move |frames: Frames| {
                    let memberships = memberships.clone();
                    let (team, headers, user, membership, body) = derived.clone();
                    async move {
                        let mut denied = Frames::new();
                        for frame in frames {
                            let accepted = match lookup(&frame, &headers, USER_HEADER) {
                                Some(id) => !memberships
                                    .join(
                                        Frames::single(frame.clone().with(&user, id)),
                                        &fields! { "member" => &user, "target" => &team },
                                        &fields! { "membership" => &membership, "status" => "accepted" },
                                    )
                                    .await
                                    .is_empty(),
                                None => false,
                            };
                            if !accepted {
                                denied.push(frame.with(
                                    &body,
                                    json!({ "error": "Not an accepted member of this team" }),
                                ));
                            }
                        }
                        Ok(denied)
                    }
                })
                .then(actions![(
                    respond,
                    fields! { "request" => &req, "status" => 403, "body" => &body }
                )])
            })
        }),
    ]
}
