/// Declares a client stub for a remote interface.
///
/// ```ignore
/// envoke_client! {
///     pub struct WeatherClient for "IWeather" {
///         fn get_forecast as "GetForecast"(city: String, days: Option<u32>) -> Forecast;
///         fn reset as "Reset"();
///     }
/// }
/// ```
///
/// Each method sends its arguments by parameter name and decodes the response
/// as the declared return type, or ignores it when there is none.
#[macro_export]
macro_rules! envoke_client {
    (@ret) => { () };
    (@ret $ret:ty) => { $ret };
    (@kind) => { $crate::ReturnType::Unit };
    (@kind $ret:ty) => { $crate::ReturnType::Json };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident for $interface:literal {
            $(
                $(#[$fn_meta:meta])*
                fn $fn_name:ident as $method:literal ( $($arg:ident : $arg_ty:ty),* $(,)? ) $(-> $ret:ty)?;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone)]
        $vis struct $name {
            dispatcher: $crate::Dispatcher,
            inbound: ::std::option::Option<$crate::HeaderMap>,
        }

        impl $name {
            pub const INTERFACE: &'static str = $interface;

            pub fn new(dispatcher: $crate::Dispatcher) -> Self {
                Self {
                    dispatcher,
                    inbound: ::std::option::Option::None,
                }
            }

            /// Calls made through the returned stub forward `headers`.
            pub fn with_inbound(&self, headers: $crate::HeaderMap) -> Self {
                Self {
                    dispatcher: self.dispatcher.clone(),
                    inbound: ::std::option::Option::Some(headers),
                }
            }

            $(
                $(#[$fn_meta])*
                pub async fn $fn_name(&self, $($arg: $arg_ty),*)
                    -> ::std::result::Result<$crate::envoke_client!(@ret $($ret)?), $crate::EnvokeError>
                {
                    #[allow(unused_mut)]
                    let mut invocation = $crate::Invocation::new(
                        $interface,
                        $method,
                        $crate::envoke_client!(@kind $($ret)?),
                    );
                    $( invocation = invocation.arg(stringify!($arg), &$arg)?; )*
                    let context = $crate::CallContext::from(self.inbound.as_ref());
                    self.dispatcher.call(invocation, context).await
                }
            )*
        }
    };
}
