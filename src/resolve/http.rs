//! HTTP resolution: middleware, controllers, resource expansion and per-action directives.

use crate::case::{class_basename, namespace_prefix, starts_uppercase, to_camel_case, to_delimited, to_studly_case};
use crate::config::{
    ActionConfig, AuthorizeConfig, ControllerConfig, Lines, MiddlewareConfig, ModelsConfig, ResourceConfig,
    ResourceOptions, SaveConfig, ValidateConfig, Words,
};
use crate::config::validator::invokable_shape;
use crate::error::ScaffoldError;
use crate::ir::{
    parse_line, Action, Argument, Authorize, Call, Controller, Method, Middleware, ModelParameter, Query,
    QuerySource, Redirect, ResourceController, Route, Save, Validation, Verb, View, INVOKE_ACTION,
    RESOURCE_ACTIONS, RESOURCE_MODEL_ACTIONS,
};
use crate::resolve::ResolutionContext;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

const CONTROLLER_SUFFIX: &str = "Controller";

/// `verbs:path [name]`, e.g. `get|post:posts/{post}/publish posts.publish`
fn route_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<verbs>[A-Za-z|]+):(?P<path>\S+)(?:\s+(?P<name>\S+))?$").expect("valid regex")
    })
}

pub fn resolve_http(ctx: &mut ResolutionContext<'_>) -> Result<(), ScaffoldError> {
    let doc = ctx.document;
    for (alias, config) in &doc.http.middleware {
        let middleware = build_middleware(alias, config.as_ref());
        ctx.middleware.insert(alias.clone(), middleware);
    }
    for (key, config) in &doc.http.controllers {
        let controller = build_controller(ctx, key, config)?;
        tracing::debug!(
            controller = %key,
            actions = controller.actions.len(),
            resource = controller.resource.is_some(),
            "controller"
        );
        ctx.controllers.insert(key.clone(), controller);
    }
    Ok(())
}

fn build_middleware(alias: &str, config: Option<&MiddlewareConfig>) -> Middleware {
    Middleware {
        alias: alias.to_string(),
        class: config
            .and_then(|c| c.name.clone())
            .unwrap_or_else(|| format!("{}Middleware", to_studly_case(alias))),
        terminable: config.map(|c| c.terminable).unwrap_or(false),
    }
}

/// Controller key without its `Controller` suffix. e.g. "Admin\\PostController" -> "Admin\\Post"
fn route_base(key: &str) -> &str {
    key.strip_suffix(CONTROLLER_SUFFIX).unwrap_or(key)
}

fn build_controller(
    ctx: &ResolutionContext<'_>,
    key: &str,
    config: &ControllerConfig,
) -> Result<Controller, ScaffoldError> {
    let base_name = class_basename(route_base(key));
    let class = format!("{}{}", to_studly_case(base_name), CONTROLLER_SUFFIX);
    let namespace = match namespace_prefix(key) {
        Some(prefix) => format!("{}\\{}", ctx.http_namespace.trim_end_matches('\\'), prefix),
        None => ctx.http_namespace.clone(),
    };
    let middleware = config.middleware.iter().flat_map(|line| parse_line(line)).collect();

    let empty = ActionConfig::default();
    let mut actions = Vec::new();
    let resource = if config.invoke {
        invokable_shape(key, config)?;
        let declared = config.actions.values().next().and_then(Option::as_ref);
        actions.push(build_action(ctx, key, INVOKE_ACTION, declared.unwrap_or(&empty), &[], false)?);
        None
    } else {
        let resource = build_resource(ctx, key, base_name, config.resource.as_ref())?;
        if let Some(resource) = &resource {
            let bound = resource_model(ctx, resource, key)?;
            for name in &resource.actions {
                let declared = config.actions.get(name.as_str());
                let defaults: &[ModelParameter] = if RESOURCE_MODEL_ACTIONS.contains(&name.as_str()) {
                    std::slice::from_ref(&bound)
                } else {
                    &[]
                };
                let action_config = declared.and_then(Option::as_ref).unwrap_or(&empty);
                actions.push(build_action(ctx, key, name, action_config, defaults, declared.is_none())?);
            }
        }
        for (name, declared) in &config.actions {
            let expanded = resource.as_ref().map(|r| r.actions.contains(name)).unwrap_or(false);
            if expanded {
                continue;
            }
            actions.push(build_action(ctx, key, name, declared.as_ref().unwrap_or(&empty), &[], false)?);
        }
        resource
    };

    Ok(Controller {
        key: key.to_string(),
        class,
        namespace,
        invokable: config.invoke,
        resource,
        middleware,
        actions,
    })
}

fn build_resource(
    ctx: &ResolutionContext<'_>,
    key: &str,
    base_name: &str,
    config: Option<&ResourceConfig>,
) -> Result<Option<ResourceController>, ScaffoldError> {
    let defaults = ResourceOptions::default();
    let options = match config {
        None | Some(ResourceConfig::Toggle(false)) => return Ok(None),
        Some(ResourceConfig::Toggle(true)) => &defaults,
        Some(ResourceConfig::Declared(options)) => options,
    };
    let owner = format!("{}.resource", key);

    let names = options
        .models
        .as_ref()
        .map(Words::to_vec)
        .unwrap_or_else(|| vec![base_name.to_string()]);
    let mut entities = names
        .iter()
        .map(|name| ctx.entity_key(name, &owner))
        .collect::<Result<Vec<_>, _>>()?;
    if entities.is_empty() {
        return Err(ScaffoldError::structural(owner, "resource requires at least one model"));
    }
    if options.json {
        entities.truncate(1);
    }

    let only = options.only.as_ref().map(Words::to_vec).unwrap_or_default();
    let except = options.except.as_ref().map(Words::to_vec).unwrap_or_default();
    for action in only.iter().chain(except.iter()) {
        if !RESOURCE_ACTIONS.contains(&action.as_str()) {
            return Err(ScaffoldError::missing("resource action", action.clone(), &owner));
        }
    }
    if !only.is_empty() && !except.is_empty() {
        tracing::warn!(controller = %key, "resource declares both 'only' and 'except'; 'except' wins");
    }
    let actions = RESOURCE_ACTIONS
        .iter()
        .filter(|a| {
            if !except.is_empty() {
                !except.iter().any(|e| e == *a)
            } else if !only.is_empty() {
                only.iter().any(|o| o == *a)
            } else {
                true
            }
        })
        .map(|a| a.to_string())
        .collect();

    Ok(Some(ResourceController {
        entities,
        json: options.json,
        api: options.api || options.json,
        only,
        except,
        actions,
    }))
}

/// The first resource model, bound by show / update / delete.
fn resource_model(
    ctx: &ResolutionContext<'_>,
    resource: &ResourceController,
    key: &str,
) -> Result<ModelParameter, ScaffoldError> {
    let owner = format!("{}.resource", key);
    let entity_key = resource
        .entities
        .first()
        .ok_or_else(|| ScaffoldError::structural(&owner, "resource requires at least one model"))?;
    let entity = ctx.entity(entity_key, &owner)?;
    Ok(ModelParameter {
        entity: entity.key.clone(),
        variable: to_camel_case(&entity.class),
        bind_column: entity.route_binding.clone(),
    })
}

fn build_action(
    ctx: &ResolutionContext<'_>,
    controller: &str,
    name: &str,
    config: &ActionConfig,
    default_models: &[ModelParameter],
    from_resource: bool,
) -> Result<Action, ScaffoldError> {
    let owner = format!("{}.{}", controller, name);

    let models = match &config.models {
        Some(models) => resolve_models(ctx, models, &owner)?,
        None => default_models.to_vec(),
    };
    let route = match &config.route {
        Some(line) => parse_route(line, controller, name, &owner)?,
        None => guess_route(controller, name, &models),
    };
    let authorize = resolve_authorize(ctx, config.authorize.as_ref(), name, &models, &owner)?;
    let validate = config
        .validate
        .as_ref()
        .map(|v| resolve_validate(v, &owner))
        .transpose()?;

    let mut scope: Vec<String> = models.iter().map(|m| m.variable.clone()).collect();
    let queries = resolve_queries(ctx, &config.queries, &mut scope, &owner)?;

    let from_form_request = validate.as_ref().map(Validation::is_delegated).unwrap_or(false);
    let save = config
        .save
        .as_ref()
        .map(|s| resolve_save(ctx, s, from_form_request, &owner))
        .transpose()?;

    if let Some(variable) = &config.delete {
        if !scope.contains(variable) {
            return Err(ScaffoldError::missing("variable", variable.clone(), format!("{}.delete", owner)));
        }
    }

    let redirect = config
        .redirect
        .as_deref()
        .map(|line| resolve_redirect(line, &owner))
        .transpose()?;
    let view = config
        .view
        .as_deref()
        .map(|line| resolve_view(line, &owner))
        .transpose()?;

    Ok(Action {
        name: name.to_string(),
        route,
        models,
        authorize,
        validate,
        queries,
        save,
        delete: config.delete.clone(),
        fire: calls(config.fire.as_ref()),
        notify: calls(config.notify.as_ref()),
        flash: calls(config.flash.as_ref()),
        redirect,
        view,
        from_resource,
    })
}

fn resolve_models(
    ctx: &ResolutionContext<'_>,
    config: &ModelsConfig,
    owner: &str,
) -> Result<Vec<ModelParameter>, ScaffoldError> {
    let mut models = Vec::new();
    for (variable, token) in config.entries() {
        if token.is_empty() {
            continue;
        }
        let (model, column) = match token.split_once(':') {
            Some((model, column)) => (model, Some(column.to_string())),
            None => (token.as_str(), None),
        };
        let entity = ctx.entity(model, owner)?;
        let bind_column = column.or_else(|| entity.route_binding.clone());
        if let Some(column) = &bind_column {
            if !entity.columns.contains_key(column) {
                return Err(ScaffoldError::missing(
                    "column",
                    column.clone(),
                    format!("{}.models.{}", owner, entity.key),
                ));
            }
        }
        models.push(ModelParameter {
            entity: entity.key.clone(),
            variable: variable.unwrap_or_else(|| to_camel_case(&entity.class)),
            bind_column,
        });
    }
    Ok(models)
}

fn parse_route(line: &str, controller: &str, action: &str, owner: &str) -> Result<Route, ScaffoldError> {
    let caps = route_pattern()
        .captures(line.trim())
        .ok_or_else(|| ScaffoldError::structural(owner, format!("route '{}' must be 'verbs:path [name]'", line)))?;
    let verbs = caps["verbs"]
        .split('|')
        .filter(|v| !v.is_empty())
        .map(|v| Verb::parse(v).ok_or_else(|| ScaffoldError::missing("verb", v, format!("{}.route", owner))))
        .collect::<Result<Vec<_>, _>>()?;
    let name = caps
        .name("name")
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| guessed_route_name(controller, action));
    Ok(Route {
        verbs,
        path: caps["path"].to_string(),
        name,
        guessed: false,
    })
}

fn guessed_route_name(controller: &str, action: &str) -> String {
    let prefix = to_delimited(route_base(controller), ".");
    if action == INVOKE_ACTION {
        prefix
    } else {
        format!("{}.{}", prefix, action)
    }
}

/// Verbs from the action name; path from the controller key, the action and bound models.
fn guess_route(controller: &str, action: &str, models: &[ModelParameter]) -> Route {
    let mut path = format!("{}/{}", to_delimited(route_base(controller), "/"), Route::action_segment(action));
    for (i, model) in models.iter().enumerate() {
        if !path.ends_with('/') {
            path.push('/');
        }
        if i == 0 {
            path.push_str(&model.qualified_path());
        } else {
            path.push_str(&model.directory_qualified_path());
        }
    }
    Route {
        verbs: Verb::for_action(action),
        path,
        name: guessed_route_name(controller, action),
        guessed: true,
    }
}

fn resolve_authorize(
    ctx: &ResolutionContext<'_>,
    config: Option<&AuthorizeConfig>,
    action: &str,
    models: &[ModelParameter],
    owner: &str,
) -> Result<Authorize, ScaffoldError> {
    match config {
        Some(AuthorizeConfig::Toggle(false)) => Ok(Authorize::Disabled),
        None | Some(AuthorizeConfig::Toggle(true)) => Ok(Authorize::Ability {
            ability: action.to_string(),
            entity: None,
            parameters: models.iter().map(|m| m.variable.clone()).collect(),
        }),
        Some(AuthorizeConfig::Line(line)) => {
            let mut tokens = line.split_whitespace();
            let ability = tokens
                .next()
                .ok_or_else(|| ScaffoldError::structural(owner, "empty authorize line"))?;
            let mut entity = None;
            let mut parameters = Vec::new();
            for token in tokens {
                if entity.is_none() && parameters.is_empty() && starts_uppercase(token) {
                    entity = Some(ctx.entity_key(token, &format!("{}.authorize", owner))?);
                } else {
                    parameters.push(token.to_string());
                }
            }
            Ok(Authorize::Ability {
                ability: ability.to_string(),
                entity,
                parameters,
            })
        }
    }
}

fn resolve_validate(config: &ValidateConfig, owner: &str) -> Result<Validation, ScaffoldError> {
    match config {
        ValidateConfig::Delegated(class) if starts_uppercase(class) => Ok(Validation::Delegated {
            class: class.trim().to_string(),
        }),
        ValidateConfig::Delegated(other) => Err(ScaffoldError::structural(
            owner,
            format!("validate '{}' must be a validator class or a map of field rules", other),
        )),
        ValidateConfig::Fields(fields) => Ok(Validation::Inline {
            fields: fields
                .iter()
                .map(|(field, rules)| {
                    let methods: Vec<Method> = rules.to_vec().iter().map(|r| Method::parse(r)).collect();
                    (field.clone(), methods)
                })
                .collect(),
        }),
    }
}

/// Each query may read bound models and earlier queries; its own variable joins the scope.
fn resolve_queries(
    ctx: &ResolutionContext<'_>,
    config: &IndexMap<String, String>,
    scope: &mut Vec<String>,
    owner: &str,
) -> Result<Vec<Query>, ScaffoldError> {
    let mut queries = Vec::new();
    for (variable, line) in config {
        let query_owner = format!("{}.queries.{}", owner, variable);
        let mut tokens = line.split_whitespace();
        let head = tokens
            .next()
            .ok_or_else(|| ScaffoldError::structural(&query_owner, "empty query line"))?;
        let source = if starts_uppercase(head) {
            QuerySource::Entity(ctx.entity_key(head, &query_owner)?)
        } else if scope.iter().any(|v| v == head) {
            QuerySource::Variable(head.to_string())
        } else {
            return Err(ScaffoldError::missing("variable", head, query_owner));
        };
        queries.push(Query {
            variable: variable.clone(),
            source,
            methods: tokens.map(Method::parse_directive).collect(),
        });
        scope.push(variable.clone());
    }
    Ok(queries)
}

fn resolve_save(
    ctx: &ResolutionContext<'_>,
    config: &SaveConfig,
    from_form_request: bool,
    owner: &str,
) -> Result<Save, ScaffoldError> {
    let save_owner = format!("{}.save", owner);
    match config {
        SaveConfig::Target(target) if starts_uppercase(target) => {
            let entity = ctx.entity(target.trim(), &save_owner)?;
            Ok(Save {
                variable: to_camel_case(&entity.class),
                entity: Some(entity.key.clone()),
                merge: IndexMap::new(),
                from_form_request,
            })
        }
        SaveConfig::Target(variable) => Ok(Save {
            variable: variable.trim().to_string(),
            entity: None,
            merge: IndexMap::new(),
            from_form_request,
        }),
        SaveConfig::Merge(map) => {
            let mut entries = map.iter();
            let (Some((variable, attributes)), None) = (entries.next(), entries.next()) else {
                return Err(ScaffoldError::structural(save_owner, "save map must name exactly one variable"));
            };
            Ok(Save {
                variable: variable.clone(),
                entity: None,
                merge: attributes.clone(),
                from_form_request,
            })
        }
    }
}

fn calls(lines: Option<&Lines>) -> Vec<Call> {
    lines
        .map(Lines::to_vec)
        .unwrap_or_default()
        .iter()
        .filter_map(|line| Call::parse(line))
        .collect()
}

fn resolve_redirect(line: &str, owner: &str) -> Result<Redirect, ScaffoldError> {
    let mut tokens = line.split_whitespace();
    let target = tokens
        .next()
        .ok_or_else(|| ScaffoldError::structural(owner, "empty redirect"))?;
    Ok(if target == "back" {
        Redirect::Back
    } else if target.starts_with('/') {
        Redirect::Url {
            path: target.to_string(),
        }
    } else {
        Redirect::Route {
            name: target.to_string(),
            arguments: tokens.map(Argument::parse_reference).collect(),
        }
    })
}

fn resolve_view(line: &str, owner: &str) -> Result<View, ScaffoldError> {
    let mut tokens = line.split_whitespace();
    let name = tokens
        .next()
        .ok_or_else(|| ScaffoldError::structural(owner, "empty view"))?;
    Ok(View {
        name: name.to_string(),
        variables: tokens.map(str::to_string).collect(),
    })
}
