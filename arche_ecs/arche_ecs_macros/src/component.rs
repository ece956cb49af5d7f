//! Derive macro for the `Component` trait.

use proc_macro2::{Ident, TokenStream};
use quote::quote;
use syn::{DeriveInput, Error, Result};

pub(crate) fn impl_component(input: DeriveInput, crate_root: &Ident) -> Result<TokenStream> {
    let type_name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "`Component` can not be derived for generic types",
        ));
    }

    Ok(quote! {
        impl #crate_root::component::Component for #type_name {
            const COMPONENT_ID: #crate_root::component::ComponentID =
                #crate_root::component::ComponentID::hashed_from_str(
                    concat!(module_path!(), "::", stringify!(#type_name))
                );
        }

        #crate_root::inventory::submit! {
            #crate_root::component::ComponentDescriptor {
                id: <#type_name as #crate_root::component::Component>::COMPONENT_ID,
                name: stringify!(#type_name),
                size: ::std::mem::size_of::<#type_name>(),
            }
        }
    })
}
