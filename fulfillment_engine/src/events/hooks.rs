use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    DriverAssignedEvent,
    EventHandler,
    EventProducer,
    Handler,
    OrderCreatedEvent,
    OrderDeliveredEvent,
    ReturnStatusChangedEvent,
    VendorStatusChangedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub vendor_status_producer: Vec<EventProducer<VendorStatusChangedEvent>>,
    pub driver_assigned_producer: Vec<EventProducer<DriverAssignedEvent>>,
    pub order_delivered_producer: Vec<EventProducer<OrderDeliveredEvent>>,
    pub return_status_producer: Vec<EventProducer<ReturnStatusChangedEvent>>,
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_vendor_status_changed: Option<EventHandler<VendorStatusChangedEvent>>,
    pub on_driver_assigned: Option<EventHandler<DriverAssignedEvent>>,
    pub on_order_delivered: Option<EventHandler<OrderDeliveredEvent>>,
    pub on_return_status_changed: Option<EventHandler<ReturnStatusChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_created = hooks.on_order_created.map(|f| EventHandler::new(buffer_size, f));
        let on_vendor_status_changed = hooks.on_vendor_status_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_driver_assigned = hooks.on_driver_assigned.map(|f| EventHandler::new(buffer_size, f));
        let on_order_delivered = hooks.on_order_delivered.map(|f| EventHandler::new(buffer_size, f));
        let on_return_status_changed = hooks.on_return_status_changed.map(|f| EventHandler::new(buffer_size, f));
        Self {
            on_order_created,
            on_vendor_status_changed,
            on_driver_assigned,
            on_order_delivered,
            on_return_status_changed,
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_vendor_status_changed {
            result.vendor_status_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_driver_assigned {
            result.driver_assigned_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_delivered {
            result.order_delivered_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_return_status_changed {
            result.return_status_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_created {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_vendor_status_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_driver_assigned {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_delivered {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_return_status_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_vendor_status_changed: Option<Handler<VendorStatusChangedEvent>>,
    pub on_driver_assigned: Option<Handler<DriverAssignedEvent>>,
    pub on_order_delivered: Option<Handler<OrderDeliveredEvent>>,
    pub on_return_status_changed: Option<Handler<ReturnStatusChangedEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_vendor_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(VendorStatusChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_vendor_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_driver_assigned<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DriverAssignedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_driver_assigned = Some(Arc::new(f));
        self
    }

    pub fn on_order_delivered<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderDeliveredEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_delivered = Some(Arc::new(f));
        self
    }

    pub fn on_return_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ReturnStatusChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_return_status_changed = Some(Arc::new(f));
        self
    }
}
