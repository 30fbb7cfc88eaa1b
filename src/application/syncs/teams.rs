//! Team endpoints expressed as synchronizations.
//!
//! - `POST /api/teams` creates a team, answers 201 with it or 422 with the
//!   error, and invites plus auto-accepts the optional `owner`
//! - `GET /api/teams` answers 200 with every team

use serde_json::{json, Value};
use uuid::Uuid;

use crate::application::engine::ConceptHandle;
use crate::domain::sync::{sync, Frames, SyncDeclaration, SyncFactory, Vars};
use crate::{actions, fields};

use super::lookup;

const TEAMS_PATH: &str = "/api/teams";

pub fn team_syncs(
    api: &ConceptHandle,
    team: &ConceptHandle,
    membership: &ConceptHandle,
) -> Vec<(&'static str, SyncFactory)> {
    let request = api.action("request");
    let respond = api.action("respond");
    let create = team.action("create");
    let invite = membership.action("invite");
    let accept = membership.action("accept");
    let list = team.query_ref("_list");

    vec![
        ("CreateTeam", {
            let (request, create) = (request.clone(), create.clone());
            sync(move |vars: &mut Vars| {
                let body = vars.var("body");
                let team = vars.var("team");
                let name = vars.var("name");
                let description = vars.var("description");
                let derived = (body.clone(), team.clone(), name.clone(), description.clone());

                SyncDeclaration::when(actions![(
                    request,
                    fields! { "method" => "POST", "path" => TEAMS_PATH, "body" => &body }
                )])
                .where_fn(move |frames: Frames| {
                    let (body, team, name, description) = &derived;
                    Ok(frames.map(|frame| {
                        let given_name = lookup(&frame, body, "name").unwrap_or(Value::Null);
                        let given_description =
                            lookup(&frame, body, "description").unwrap_or_else(|| json!(""));
                        frame
                            .with(team, Uuid::new_v4().to_string())
                            .with(name, given_name)
                            .with(description, given_description)
                    }))
                })
                .then(actions![(
                    create,
                    fields! { "team" => &team, "name" => &name, "description" => &description }
                )])
            })
        }),
        ("CreateTeamResponse", {
            let (request, create, respond) = (request.clone(), create.clone(), respond.clone());
            sync(move |vars: &mut Vars| {
                let req = vars.var("request");
                let team = vars.var("team");
                SyncDeclaration::when(actions![
                    (
                        request,
                        fields! { "method" => "POST", "path" => TEAMS_PATH },
                        fields! { "request" => &req }
                    ),
                    (create, fields! {}, fields! { "team" => &team }),
                ])
                .then(actions![(
                    respond,
                    fields! { "request" => &req, "status" => 201, "body" => &team }
                )])
            })
        }),
        ("CreateTeamError", {
            let (request, create, respond) = (request.clone(), create.clone(), respond.clone());
            sync(move |vars: &mut Vars| {
                let req = vars.var("request");
                let error = vars.var("error");
                let body = vars.var("body");
                let derived = (error.clone(), body.clone());
                SyncDeclaration::when(actions![
                    (
                        request,
                        fields! { "method" => "POST", "path" => TEAMS_PATH },
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
        ("InviteTeamOwner", {
            let (request, create) = (request.clone(), create.clone());
            sync(move |vars: &mut Vars| {
                let owner = vars.var("owner");
                let team = vars.var("team");
                let target = vars.var("target");
                let derived = (team.clone(), target.clone());
                SyncDeclaration::when(actions![
                    (
                        request,
                        fields! { "method" => "POST", "path" => TEAMS_PATH, "owner" => &owner }
                    ),
                    (create, fields! {}, fields! { "team" => &team }),
                ])
                .where_fn(move |frames: Frames| {
                    let (team, target) = &derived;
                    Ok(frames
                        .filter(|frame| lookup(frame, team, "id").is_some())
                        .map(|frame| {
                            let id = lookup(&frame, team, "id").unwrap_or(Value::Null);
                            frame.with(target, id)
                        }))
                })
                .then(actions![(
                    invite,
                    fields! { "member" => &owner, "target" => &target, "role" => "owner" }
                )])
            })
        }),
        ("AutoAcceptOwner", {
            let invite = membership.action("invite");
            sync(move |vars: &mut Vars| {
                let id = vars.var("membership");
                SyncDeclaration::when(actions![(
                    invite,
                    fields! { "role" => "owner" },
                    fields! { "membership" => &id }
                )])
                .then(actions![(accept, fields! { "membership" => &id })])
            })
        }),
        ("ListTeams", {
            let (request, respond) = (request.clone(), respond.clone());
            sync(move |vars: &mut Vars| {
                let req = vars.var("request");
                let id = vars.var("id");
                let name = vars.var("name");
                let description = vars.var("description");
                let teams = vars.var("teams");
                let derived = (id, name, description, teams.clone());
                SyncDeclaration::when(actions![(
                    request,
                    fields! { "method" => "GET", "path" => TEAMS_PATH },
                    fields! { "request" => &req }
                )])
                .where_async(move |frames: Frames| {
                    let list = list.clone();
                    let (id, name, description, teams) = derived.clone();
                    async move {
                        let rows = fields! { "team" => &id, "name" => &name, "description" => &description };
                        let listed = list
                            .join(frames.clone(), &fields! {}, &rows)
                            .await
                            .collect_as(&[id, name, description], &teams);
                        if listed.is_empty() {
                            return Ok(frames.map(|frame| frame.with(&teams, json!([]))));
                        }
                        Ok(listed)
                    }
                })
                .then(actions![(
                    respond,
                    fields! { "request" => &req, "status" => 200, "body" => &teams }
                )])
            })
        }),
    ]
}
