//! Dispatch boundary tests
//!
//! Drives a matched controller dispatch through a ControllerInvoker
//! implementation the way the invocation collaborator would, verifying the
//! failure taxonomy and option passthrough.

use junction_dispatch::{
    ControllerDispatch, ControllerInvoker, Dispatch, DispatchDecision, DispatchError,
    DispatchOptions, Params, Response,
};
use junction_router::{RouteRequest, Router, RouterConfig};

/// Minimal invoker over a static controller table.
struct TableInvoker;

impl ControllerInvoker for TableInvoker {
    fn invoke(
        &self,
        dispatch: &ControllerDispatch,
        params: &Params,
        options: &DispatchOptions,
    ) -> Result<Response, DispatchError> {
        match dispatch.controller.as_str() {
            "blog" => match dispatch.action.as_str() {
                "read" => {
                    let id = params.get("id").unwrap_or("?");
                    let convert = options.convert.unwrap_or(true);
                    Ok(Response::new(format!("blog {id} convert={convert}")))
                }
                _ => Err(DispatchError::MethodNotExists {
                    class: dispatch.controller.clone(),
                    action: dispatch.action.clone(),
                }),
            },
            _ => Err(DispatchError::ClassNotFound {
                class: dispatch.controller.clone(),
            }),
        }
    }
}

fn dispatch_for(router: &Router, path: &str) -> Dispatch {
    let request = RouteRequest::new("www.example.com", "www", "GET");
    router.check(&request, path).unwrap()
}

#[test]
fn test_matched_dispatch_invokes() {
    let mut router = Router::with_host("www.example.com");
    router.get("blog/:id", "Blog/read").unwrap();

    let dispatch = dispatch_for(&router, "blog/5");
    let controller = match &dispatch.decision {
        DispatchDecision::Controller(c) => c.clone(),
        other => panic!("expected controller dispatch, got {other:?}"),
    };

    let response = TableInvoker
        .invoke(&controller, &dispatch.params, &dispatch.options)
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "blog 5 convert=true");
}

#[test]
fn test_unknown_controller_maps_to_404() {
    let mut router = Router::with_host("www.example.com");
    router.get("shop/:id", "Shop/read").unwrap();

    let dispatch = dispatch_for(&router, "shop/9");
    let controller = match &dispatch.decision {
        DispatchDecision::Controller(c) => c.clone(),
        other => panic!("expected controller dispatch, got {other:?}"),
    };

    let err = TableInvoker
        .invoke(&controller, &dispatch.params, &dispatch.options)
        .unwrap_err();
    assert!(matches!(err, DispatchError::ClassNotFound { .. }));
    assert_eq!(err.http_status(), 404);
}

#[test]
fn test_unknown_action_maps_to_404() {
    let mut router = Router::with_host("www.example.com");
    router.get("blog/:id/stats", "Blog/stats").unwrap();

    let dispatch = dispatch_for(&router, "blog/5/stats");
    let controller = match &dispatch.decision {
        DispatchDecision::Controller(c) => c.clone(),
        other => panic!("expected controller dispatch, got {other:?}"),
    };

    let err = TableInvoker
        .invoke(&controller, &dispatch.params, &dispatch.options)
        .unwrap_err();
    assert_eq!(
        err,
        DispatchError::MethodNotExists {
            class: "blog".to_string(),
            action: "stats".to_string(),
        }
    );
}

#[test]
fn test_rule_options_reach_the_invoker() {
    let config = RouterConfig {
        route_params_first: false,
        ..Default::default()
    };
    let mut router = Router::new("www.example.com", config);
    router
        .get("blog/:id", "Blog/read")
        .unwrap()
        .convert(false)
        .route_params_first(true);

    let dispatch = dispatch_for(&router, "blog/5");
    assert_eq!(dispatch.options.convert, Some(false));
    assert_eq!(dispatch.options.route_params_first, Some(true));
}
