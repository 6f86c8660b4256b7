use std::collections::VecDeque;
use std::sync::Mutex;

use pmotr064::{
    ActionOptions, DeviceEndpoint, Tr064Client, Tr064Error, Transport, TransportError,
    TransportResponse, UpnpFault,
};

const SERVICE: &str = "urn:dslforum-org:service:DeviceInfo:1";

const DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:dslforum-org:device-1-0">
<device><serviceList>
<service>
<serviceType>urn:dslforum-org:service:DeviceInfo:1</serviceType>
<serviceId>urn:DeviceInfo-com:serviceId:DeviceInfo1</serviceId>
<controlURL>/upnp/control/deviceinfo</controlURL>
</service>
<service>
<serviceType>urn:dslforum-org:service:X_AVM-DE_OnTel:1</serviceType>
<serviceId>urn:X_AVM-DE_OnTel-com:serviceId:X_AVM-DE_OnTel1</serviceId>
<controlURL>/upnp/control/x_contact</controlURL>
</service>
</serviceList></device>
</root>"#;

/// Transport that records every request and replays scripted replies
#[derive(Default)]
struct MockDevice {
    replies: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    requests: Mutex<Vec<(String, String, String)>>,
}

impl MockDevice {
    fn with_replies(replies: Vec<Result<TransportResponse, TransportError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn bodies(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body, _)| body.clone())
            .collect()
    }

    fn authenticated_sends(&self) -> usize {
        self.bodies()
            .iter()
            .filter(|b| b.contains("<h:ClientAuth"))
            .count()
    }
}

impl Transport for MockDevice {
    fn send(
        &self,
        url: &str,
        body: &str,
        soap_action: &str,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push((
            url.to_string(),
            body.to_string(),
            soap_action.to_string(),
        ));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("device received more requests than scripted")
    }

    fn fetch(&self, _url: &str) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse::new(200, DESCRIPTION))
    }
}

fn challenge(status: u16, nonce: &str) -> Result<TransportResponse, TransportError> {
    Ok(TransportResponse::new(
        status,
        format!(
            r#"<?xml version="1.0"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Header><h:Challenge xmlns:h="http://soap-authentication.org/digest/2001/10/" s:mustUnderstand="1"><Status>Unauthenticated</Status><Nonce>{nonce}</Nonce><Realm>F!Box SOAP-Auth</Realm></h:Challenge></s:Header><s:Body><s:Fault><faultcode>s:Client</faultcode><faultstring>UPnPError</faultstring><detail><UPnPError xmlns="urn:dslforum-org:control-1-0"><errorCode>503</errorCode><errorDescription>Auth. failed</errorDescription></UPnPError></detail></s:Fault></s:Body></s:Envelope>"#
        ),
    ))
}

fn success(next_nonce: &str) -> Result<TransportResponse, TransportError> {
    Ok(TransportResponse::new(
        200,
        format!(
            r#"<?xml version="1.0"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Header><h:NextChallenge xmlns:h="http://soap-authentication.org/digest/2001/10/" s:mustUnderstand="1"><Nonce>{next_nonce}</Nonce><Status>Authenticated</Status><Realm>F!Box SOAP-Auth</Realm></h:NextChallenge></s:Header><s:Body><u:GetInfoResponse xmlns:u="urn:dslforum-org:service:DeviceInfo:1"><NewModelName>FRITZ!Box 7590</NewModelName><NewSoftwareVersion>154.07.57</NewSoftwareVersion></u:GetInfoResponse></s:Body></s:Envelope>"#
        ),
    ))
}

fn client(device: MockDevice) -> Tr064Client<MockDevice> {
    Tr064Client::with_transport(
        DeviceEndpoint::new("192.168.178.1", 49000, "admin", "pw"),
        device,
    )
}

#[test]
fn first_call_elicits_challenge_then_authenticates() {
    let client = client(MockDevice::with_replies(vec![
        challenge(500, "abc123"),
        success("def456"),
    ]));

    let response = client
        .action(SERVICE, "GetInfo", ActionOptions::default())
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.get("NewModelName"), Some("FRITZ!Box 7590"));

    let requests = client.transport().requests.lock().unwrap();
    assert_eq!(requests.len(), 2);

    let (url, init, soap_action) = &requests[0];
    assert_eq!(url, "http://192.168.178.1:49000/upnp/control/deviceinfo");
    assert_eq!(soap_action, "urn:dslforum-org:service:DeviceInfo:1#GetInfo");
    assert!(init.contains("<h:InitChallenge"));
    assert!(init.contains("<UserID>admin</UserID>"));

    let (_, auth, _) = &requests[1];
    assert!(auth.contains("<Nonce>abc123</Nonce>"));
    assert!(auth.contains("<Auth>48b0768104e3e366d7d0c7f6a6ab471e</Auth>"));
    assert!(auth.contains("<Realm>F!Box SOAP-Auth</Realm>"));
}

#[test]
fn single_retry_then_authentication_failure() {
    let client = client(MockDevice::with_replies(vec![
        challenge(500, "abc123"),
        challenge(401, "n2"),
        challenge(401, "n3"),
    ]));

    let err = client
        .action(SERVICE, "GetInfo", ActionOptions::default())
        .unwrap_err();

    assert!(matches!(
        err,
        Tr064Error::AuthenticationFailed { ref service, ref action, status: 401 }
            if service == SERVICE && action == "GetInfo"
    ));

    let device = client.transport();
    assert_eq!(device.authenticated_sends(), 2);
    assert_eq!(device.bodies().len(), 3);
    assert!(device.replies.lock().unwrap().is_empty());

    let bodies = device.bodies();
    assert!(bodies[1].contains("<Nonce>abc123</Nonce>"));
    assert!(bodies[2].contains("<Nonce>n2</Nonce>"));
}

#[test]
fn soap_level_unauthenticated_status_triggers_retry() {
    let client = client(MockDevice::with_replies(vec![
        challenge(500, "abc123"),
        challenge(500, "n2"),
        success("n3"),
    ]));

    let response = client
        .action(SERVICE, "GetInfo", ActionOptions::default())
        .unwrap();

    assert_eq!(response.get("NewSoftwareVersion"), Some("154.07.57"));
    assert_eq!(client.transport().authenticated_sends(), 2);
}

#[test]
fn retry_can_be_disabled() {
    let client = client(MockDevice::with_replies(vec![
        challenge(500, "abc123"),
        challenge(401, "n2"),
    ]));

    let err = client
        .action(
            SERVICE,
            "GetInfo",
            ActionOptions::new().retry_on_auth_failure(false),
        )
        .unwrap_err();

    assert!(err.is_auth_error());
    assert_eq!(client.transport().authenticated_sends(), 1);
}

#[test]
fn rejected_nonce_is_not_reused() {
    // The rejection repeats the stale nonce: a new challenge must be elicited
    let client = client(MockDevice::with_replies(vec![
        challenge(500, "abc123"),
        challenge(401, "abc123"),
        challenge(500, "fresh"),
        success("next"),
    ]));

    client
        .action(SERVICE, "GetInfo", ActionOptions::default())
        .unwrap();

    let bodies = client.transport().bodies();
    assert_eq!(bodies.len(), 4);
    assert!(bodies[2].contains("<h:InitChallenge"));
    assert!(bodies[3].contains("<Nonce>fresh</Nonce>"));
}

#[test]
fn missing_challenge_is_reported() {
    let client = client(MockDevice::with_replies(vec![Ok(TransportResponse::new(
        500,
        "<s:Envelope><s:Body>oops</s:Body></s:Envelope>",
    ))]));

    let err = client
        .action(SERVICE, "GetInfo", ActionOptions::default())
        .unwrap_err();

    assert!(matches!(err, Tr064Error::Challenge { status: 500, .. }));
}

#[test]
fn transport_failure_is_not_retried() {
    let client = client(MockDevice::with_replies(vec![
        challenge(500, "abc123"),
        Err(TransportError::Request {
            url: "http://192.168.178.1:49000/upnp/control/deviceinfo".to_string(),
            message: "connection reset".to_string(),
        }),
    ]));

    let err = client
        .action(SERVICE, "GetInfo", ActionOptions::default())
        .unwrap_err();

    assert!(matches!(err, Tr064Error::Transport(TransportError::Request { .. })));
    assert_eq!(client.transport().bodies().len(), 2);
}

#[test]
fn upnp_fault_is_surfaced() {
    let fault = r#"<s:Envelope><s:Header><h:NextChallenge><Nonce>n2</Nonce><Status>Authenticated</Status><Realm>F!Box SOAP-Auth</Realm></h:NextChallenge></s:Header><s:Body><s:Fault><faultcode>s:Client</faultcode><faultstring>UPnPError</faultstring><detail><UPnPError><errorCode>402</errorCode><errorDescription>Invalid Args</errorDescription></UPnPError></detail></s:Fault></s:Body></s:Envelope>"#;
    let client = client(MockDevice::with_replies(vec![
        challenge(500, "abc123"),
        Ok(TransportResponse::new(500, fault)),
    ]));

    let err = client
        .action(
            SERVICE,
            "GetInfo",
            ActionOptions::new().param("NewBogus", "1"),
        )
        .unwrap_err();

    match err {
        Tr064Error::ActionFailed { status, fault, .. } => {
            assert_eq!(status, 500);
            assert_eq!(
                fault,
                Some(UpnpFault {
                    error_code: 402,
                    error_description: "Invalid Args".to_string(),
                })
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn parameters_are_sent_in_order_and_escaped() {
    let client = client(MockDevice::with_replies(vec![
        challenge(500, "abc123"),
        success("n2"),
    ]));

    client
        .action(
            "urn:DeviceInfo-com:serviceId:DeviceInfo1",
            "GetInfo",
            ActionOptions::new()
                .param("NewB", "x & y")
                .param("NewA", 2),
        )
        .unwrap();

    let bodies = client.transport().bodies();
    assert!(bodies[1].contains("<NewB>x &amp; y</NewB><NewA>2</NewA>"));
    assert!(bodies[1].contains(r#"<u:GetInfo xmlns:u="urn:DeviceInfo-com:serviceId:DeviceInfo1">"#));
}

#[test]
fn caller_action_is_delivered_exactly_once() {
    // The device runs every request it receives, with or without InitChallenge
    let client = client(MockDevice::with_replies(vec![success("N1"), success("N2")]));

    client
        .action(
            "urn:dslforum-org:service:X_AVM-DE_OnTel:1",
            "AddPhonebook",
            ActionOptions::new().param("NewPhonebookName", "Work"),
        )
        .unwrap();

    let requests = client.transport().requests.lock().unwrap();
    assert_eq!(requests.len(), 2);

    let delivered = requests
        .iter()
        .filter(|(_, body, _)| body.contains("<u:AddPhonebook"))
        .count();
    assert_eq!(delivered, 1);
    let with_params = requests
        .iter()
        .filter(|(_, body, _)| body.contains("<NewPhonebookName>Work</NewPhonebookName>"))
        .count();
    assert_eq!(with_params, 1);

    let (url, init, soap_action) = &requests[0];
    assert_eq!(url, "http://192.168.178.1:49000/upnp/control/deviceinfo");
    assert_eq!(soap_action, "urn:dslforum-org:service:DeviceInfo:1#GetInfo");
    assert!(init.contains("<h:InitChallenge"));
    assert!(!init.contains("NewPhonebookName"));

    let (url, auth, soap_action) = &requests[1];
    assert_eq!(url, "http://192.168.178.1:49000/upnp/control/x_contact");
    assert_eq!(
        soap_action,
        "urn:dslforum-org:service:X_AVM-DE_OnTel:1#AddPhonebook"
    );
    assert!(auth.contains("<h:ClientAuth"));
    assert!(auth.contains("<Nonce>N1</Nonce>"));
}
